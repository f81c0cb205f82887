use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// 스피너 스타일 (플랜 생성 중)
pub fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// 터미널이 아니면 숨김 스피너
pub fn spinner_if(visible: bool, message: &str) -> ProgressBar {
    if visible {
        create_spinner(message)
    } else {
        ProgressBar::hidden()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_spinner() {
        let spinner = create_spinner("planning...");
        assert!(!spinner.is_finished());
        spinner.finish_and_clear();
    }

    #[test]
    fn test_hidden_spinner() {
        let spinner = spinner_if(false, "planning...");
        assert!(spinner.is_hidden());
        spinner.finish_and_clear();
    }
}
