use wrtpilot::cancel::CancelToken;
use wrtpilot::config::Config;
use wrtpilot::error::Result;
use wrtpilot::pipeline::Pipeline;
use wrtpilot::session::Session;
use wrtpilot::ui::Renderer;

/// 표준 입출력으로 대화형 세션 실행
pub async fn run_interactive(config: Config, renderer: Renderer, cancel: &CancelToken) -> Result<()> {
    let mut session = Session::new(Pipeline::from_config(config), renderer);
    let mut input = std::io::stdin().lock();
    let mut output = std::io::stdout();
    session.run(&mut input, &mut output, cancel).await
}
