use crate::ai::prompt_template::PromptTemplate;
use crate::ai::{empty_response, http_client, require_key, send_json, PlanProvider};
use crate::config::Config;
use crate::error::Result;
use crate::plan::{parse_plan, Plan};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;

/// Anthropic Messages API
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicProvider {
    pub fn new(config: &Config) -> Self {
        let model = if config.model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };
        Self {
            client: http_client(),
            api_key: config.anthropic_api_key.clone(),
            endpoint: config.anthropic_endpoint.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl PlanProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn generate_plan(&self, prompt: &str) -> Result<Plan> {
        require_key(self.name(), &self.api_key, "ANTHROPIC_API_KEY")?;

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };
        tracing::debug!(model = %self.model, "requesting plan from anthropic");

        let request = self
            .client
            .post(format!("{}/messages", self.endpoint))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let response: MessagesResponse = send_json(self.name(), request).await?;

        let text = response
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| empty_response(self.name()))?;

        parse_plan(&text)
    }

    fn supports_error_fix(&self) -> bool {
        true
    }

    async fn generate_error_fix(
        &self,
        original: &[String],
        error_output: &str,
        attempt: u32,
    ) -> Result<Plan> {
        let prompt = PromptTemplate::error_fix(original, error_output, attempt);
        self.generate_plan(&prompt).await
    }
}
