pub mod history;

pub use history::History;

use crate::ai::factory::ProviderFactory;
use crate::ai::PlanProvider;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{Result, WrtPilotError};
use crate::pipeline::Pipeline;
use crate::ui::{confirm_line, Renderer};
use colored::*;
use std::io::{BufRead, Write};
use std::sync::Arc;

const PROMPT: &str = "wrtpilot> ";

const HELP: &str = "\
Available commands:
  help                    - Show this help
  history                 - Show prompt history
  clear                   - Clear history
  status                  - Show current settings
  set <key>=<value>       - Change provider, model, dry-run or auto-approve
  !, !<number>            - Re-run the last or a numbered prompt
  exit, quit              - Leave interactive mode
  <natural language>      - Plan and run router commands";

/// 세션 입력 한 줄의 분류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Exit,
    Help,
    History,
    Clear,
    Status,
    /// `set` 뒤의 나머지 (`key=value`)
    Set(String),
    /// `!` 는 None, `!N` 은 Some(N)
    Replay(Option<usize>),
    /// 해석할 수 없는 메타 명령어
    Invalid(String),
    Prompt(String),
}

impl Input {
    /// 입력 한 줄 분류 (부수효과 없음)
    ///
    /// # Examples
    /// ```
    /// use wrtpilot::session::Input;
    ///
    /// assert_eq!(Input::parse("!2"), Input::Replay(Some(2)));
    /// assert_eq!(Input::parse("show wifi"), Input::Prompt("show wifi".to_string()));
    /// ```
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "" => return Input::Empty,
            "exit" | "quit" => return Input::Exit,
            "help" => return Input::Help,
            "history" => return Input::History,
            "clear" => return Input::Clear,
            "status" => return Input::Status,
            "set" => return Input::Set(String::new()),
            "!" => return Input::Replay(None),
            _ => {}
        }

        if let Some(rest) = line.strip_prefix("set ") {
            return Input::Set(rest.trim().to_string());
        }
        if let Some(number) = line.strip_prefix('!') {
            return match number.trim().parse::<usize>() {
                Ok(n) if n > 0 => Input::Replay(Some(n)),
                _ => Input::Invalid(format!("invalid history number: {}", number.trim())),
            };
        }
        Input::Prompt(line.to_string())
    }
}

/// provider/model 변경 시 provider를 다시 만드는 함수
pub type ProviderBuilder = Box<dyn Fn(&Config) -> Arc<dyn PlanProvider> + Send + Sync>;

enum Flow {
    Continue,
    Exit,
}

/// 대화형 세션 (REPL)
///
/// 한 줄의 에러는 출력만 하고 다음 입력을 계속 받습니다.
pub struct Session {
    pipeline: Pipeline,
    history: History,
    renderer: Renderer,
    build_provider: ProviderBuilder,
}

impl Session {
    pub fn new(pipeline: Pipeline, renderer: Renderer) -> Self {
        Self {
            pipeline,
            history: History::default(),
            renderer,
            build_provider: Box::new(ProviderFactory::create),
        }
    }

    pub fn with_provider_builder(mut self, build_provider: ProviderBuilder) -> Self {
        self.build_provider = build_provider;
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &Config {
        self.pipeline.config()
    }

    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        input: &mut R,
        output: &mut W,
        cancel: &CancelToken,
    ) -> Result<()> {
        writeln!(
            output,
            "{} (provider: {}). Type 'help' for commands, 'exit' to quit.",
            "wrtpilot interactive mode".bold(),
            self.pipeline.provider().name()
        )?;

        loop {
            if cancel.is_cancelled() {
                break;
            }
            write!(output, "{}", PROMPT)?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                break;
            }

            match self.handle_line(&line, input, output, cancel).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit) => break,
                Err(e) => writeln!(output, "{} {}", "Error:".red(), e)?,
            }
        }

        tracing::debug!(prompts = self.history.len(), "session ended");
        Ok(())
    }

    async fn handle_line<R: BufRead, W: Write>(
        &mut self,
        line: &str,
        input: &mut R,
        output: &mut W,
        cancel: &CancelToken,
    ) -> Result<Flow> {
        match Input::parse(line) {
            Input::Empty => {}
            Input::Exit => return Ok(Flow::Exit),
            Input::Help => writeln!(output, "{}", HELP)?,
            Input::History => self.show_history(output)?,
            Input::Clear => {
                self.history.clear();
                writeln!(output, "History cleared")?;
            }
            Input::Status => self.show_status(output)?,
            Input::Set(setting) => self.apply_setting(&setting, output)?,
            Input::Replay(number) => {
                let prompt = match number {
                    None => self.history.last(),
                    Some(n) => self.history.get(n),
                }
                .map(str::to_string)
                .ok_or_else(|| session_error(match number {
                    None => "no history".to_string(),
                    Some(n) => format!("no history entry {}", n),
                }))?;
                writeln!(output, "{}", prompt.dimmed())?;
                self.handle_prompt(&prompt, input, output, cancel).await?;
            }
            Input::Invalid(message) => return Err(session_error(message)),
            Input::Prompt(prompt) => self.handle_prompt(&prompt, input, output, cancel).await?,
        }
        Ok(Flow::Continue)
    }

    async fn handle_prompt<R: BufRead, W: Write>(
        &mut self,
        prompt: &str,
        input: &mut R,
        output: &mut W,
        cancel: &CancelToken,
    ) -> Result<()> {
        self.history.push(prompt);

        let plan = self.pipeline.plan(prompt, cancel).await?;
        self.renderer.render_plan(output, &plan)?;
        if plan.is_empty() {
            return Ok(());
        }

        // JSON 모드에서는 stdout에 JSON 문서만 출력
        let json = self.renderer.is_json();
        let config = self.pipeline.config();
        if config.dry_run {
            if !json {
                writeln!(output, "\n{}", "Dry run mode - no execution".yellow())?;
            }
            return Ok(());
        }
        if !config.auto_approve && !confirm_line(input, output, "Execute these commands?")? {
            if !json {
                writeln!(output, "Cancelled")?;
            }
            return Ok(());
        }

        let batch = self.pipeline.execute(&plan, cancel).await;
        self.renderer.render_batch(output, &batch)?;

        if self.pipeline.config().auto_retry && batch.failed > 0 {
            let reports = self.pipeline.heal(&batch, cancel).await;
            self.renderer.render_heal(output, &reports)?;
        }
        Ok(())
    }

    fn show_history<W: Write>(&self, output: &mut W) -> Result<()> {
        if self.history.is_empty() {
            writeln!(output, "No history")?;
        }
        for (i, prompt) in self.history.iter().enumerate() {
            writeln!(output, "{:3}  {}", i + 1, prompt)?;
        }
        Ok(())
    }

    fn show_status<W: Write>(&self, output: &mut W) -> Result<()> {
        let config = self.pipeline.config();
        let model = if config.model.is_empty() {
            "(provider default)"
        } else {
            config.model.as_str()
        };
        writeln!(output, "Provider: {}", self.pipeline.provider().name())?;
        writeln!(output, "Model: {}", model)?;
        writeln!(output, "Dry run: {}", config.dry_run)?;
        writeln!(output, "Auto approve: {}", config.auto_approve)?;
        writeln!(output, "Auto retry: {}", config.auto_retry)?;
        writeln!(output, "Max commands: {}", config.max_commands)?;
        writeln!(output, "Timeout: {}s", config.executor().timeout.as_secs())?;
        Ok(())
    }

    fn apply_setting<W: Write>(&mut self, setting: &str, output: &mut W) -> Result<()> {
        let (key, value) = setting
            .split_once('=')
            .map(|(k, v)| (k.trim(), v.trim()))
            .ok_or_else(|| session_error("usage: set key=value"))?;

        match key {
            "dry-run" => {
                let value = parse_bool(value)?;
                self.pipeline.config_mut().dry_run = value;
                writeln!(output, "Set dry-run to {}", value)?;
            }
            "auto-approve" => {
                let value = parse_bool(value)?;
                self.pipeline.config_mut().auto_approve = value;
                writeln!(output, "Set auto-approve to {}", value)?;
            }
            "provider" => {
                self.pipeline.config_mut().provider = value.to_string();
                self.rebuild_provider();
                writeln!(output, "Set provider to {}", self.pipeline.provider().name())?;
            }
            "model" => {
                self.pipeline.config_mut().model = value.to_string();
                self.rebuild_provider();
                writeln!(output, "Set model to {}", value)?;
            }
            other => return Err(session_error(format!("unknown setting: {}", other))),
        }
        Ok(())
    }

    fn rebuild_provider(&mut self) {
        let provider = (self.build_provider)(self.pipeline.config());
        self.pipeline.set_provider(provider);
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(session_error(format!("expected true or false, got {:?}", value))),
    }
}

fn session_error(message: impl Into<String>) -> WrtPilotError {
    WrtPilotError::Session(message.into())
}
