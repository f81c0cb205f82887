use crate::error::{Result, WrtPilotError};
use colored::*;
use dialoguer::Confirm;
use std::io::{BufRead, Write};

/// 터미널 확인 프롬프트 (단발 실행용)
pub struct ConfirmPrompt;

impl ConfirmPrompt {
    pub fn new() -> Self {
        Self
    }

    /// 플랜 전체 실행 확인
    pub fn confirm_plan(&self, count: usize) -> Result<bool> {
        self.ask(&format!("Execute {} command(s)?", count))
    }

    /// 명령어 하나씩 실행 확인
    pub fn confirm_command(&self, index: usize, command_line: &str) -> Result<bool> {
        eprintln!("{} {}", format!("[{}]", index + 1).cyan().bold(), command_line);
        self.ask("Run this command?")
    }

    fn ask(&self, message: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(message)
            .default(false)
            .interact()
            .map_err(|_| WrtPilotError::UserCancelled)
    }
}

impl Default for ConfirmPrompt {
    fn default() -> Self {
        Self::new()
    }
}

/// 줄 단위 `[y/N]` 확인. 입력이 끝나면 거부로 처리
pub fn confirm_line<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str) -> Result<bool> {
    write!(output, "{} [y/N]: ", message)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(false);
    }
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
