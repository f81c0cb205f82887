use crate::ai::PlanProvider;
use crate::config::Config;
use crate::error::{Result, WrtPilotError};
use crate::plan::{parse_plan, Plan};
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// 외부 CLI 호출 제한 시간
const CLI_TIMEOUT: Duration = Duration::from_secs(45);

/// 로컬에 설치된 Gemini CLI를 subprocess로 호출하는 provider
pub struct GeminiCliProvider {
    path: String,
    timeout: Duration,
}

impl GeminiCliProvider {
    pub fn new(config: &Config) -> Self {
        let path = match config.external_gemini_path.trim() {
            "" => "/usr/bin/gemini".to_string(),
            p => p.to_string(),
        };
        Self {
            path,
            timeout: CLI_TIMEOUT,
        }
    }

    pub fn cli_command(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl PlanProvider for GeminiCliProvider {
    fn name(&self) -> &str {
        "gemini-cli"
    }

    async fn generate_plan(&self, prompt: &str) -> Result<Plan> {
        tracing::debug!(cli = %self.path, "requesting plan from external gemini cli");

        let run = Command::new(&self.path)
            .arg(prompt)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                WrtPilotError::Provider(format!(
                    "{} timed out after {}s",
                    self.path,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                WrtPilotError::Provider(format!(
                    "failed to run Gemini CLI at {}: {}\n\
                     Install it or set external_gemini_path in the config.",
                    self.path, e
                ))
            })?;

        // 종료 코드와 무관하게 출력에서 플랜을 찾음
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        match parse_plan(&text) {
            Ok(plan) if !plan.is_empty() => Ok(plan),
            _ => Err(WrtPilotError::Parse(format!(
                "external gemini did not return a valid plan: {:?}",
                text.trim().chars().take(200).collect::<String>()
            ))),
        }
    }
}
