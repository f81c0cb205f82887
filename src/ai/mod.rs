pub mod anthropic;
pub mod factory;
pub mod gemini;
pub mod gemini_cli;
pub mod openai;
pub mod prompt_template;
pub mod self_heal;

#[cfg(test)]
pub(crate) mod test_support;

use crate::error::{Result, WrtPilotError};
use crate::plan::Plan;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// HTTP provider 요청 타임아웃
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Plan provider trait: turns a natural-language prompt into a [`Plan`].
///
/// Output is untrusted. Callers must run every plan, including error-fix
/// plans, through the policy engine before execution.
#[async_trait]
pub trait PlanProvider: Send + Sync {
    /// Provider id (e.g., "gemini", "openai", "anthropic", "gemini-cli")
    fn name(&self) -> &str;

    /// Generate a plan from a fully built prompt
    async fn generate_plan(&self, prompt: &str) -> Result<Plan>;

    /// Whether [`PlanProvider::generate_error_fix`] is implemented
    fn supports_error_fix(&self) -> bool {
        false
    }

    /// Ask for a replacement plan after `original` failed with `error_output`.
    /// `attempt` is 1-based.
    async fn generate_error_fix(
        &self,
        original: &[String],
        error_output: &str,
        attempt: u32,
    ) -> Result<Plan> {
        let _ = (original, error_output, attempt);
        Err(WrtPilotError::Provider(format!(
            "{} does not support error fixes",
            self.name()
        )))
    }
}

pub(crate) fn http_client() -> reqwest::Client {
    build_client(reqwest::Client::builder().timeout(HTTP_TIMEOUT))
}

fn build_client(builder: reqwest::ClientBuilder) -> reqwest::Client {
    match builder.build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "http client build failed; requests have no timeout");
            reqwest::Client::new()
        }
    }
}

/// 요청 전송 후 2xx가 아니면 상태 코드와 본문을 담은 Provider 에러 반환
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(WrtPilotError::Provider(format!(
            "{} http {}: {}",
            provider,
            status.as_u16(),
            body.trim()
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| WrtPilotError::Provider(format!("{} response decode: {}", provider, e.without_url())))
}

pub(crate) fn require_key(provider: &str, key: &str, env_var: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(WrtPilotError::Provider(format!(
            "{}: missing API key (set {})",
            provider, env_var
        )));
    }
    Ok(())
}

pub(crate) fn empty_response(provider: &str) -> WrtPilotError {
    WrtPilotError::Provider(format!("{}: empty response", provider))
}
