use crate::ai::prompt_template::PromptTemplate;
use crate::ai::{empty_response, http_client, require_key, send_json, PlanProvider};
use crate::config::Config;
use crate::error::Result;
use crate::plan::{parse_plan, Plan};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI chat completions API (JSON mode)
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &Config) -> Self {
        let model = if config.model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };
        Self {
            client: http_client(),
            api_key: config.openai_api_key.clone(),
            endpoint: config.openai_endpoint.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl PlanProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate_plan(&self, prompt: &str) -> Result<Plan> {
        require_key(self.name(), &self.api_key, "OPENAI_API_KEY")?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            response_format: ResponseFormat { kind: "json_object" },
        };
        tracing::debug!(model = %self.model, "requesting plan from openai");

        let request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: ChatResponse = send_json(self.name(), request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
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
