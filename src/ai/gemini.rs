use crate::ai::prompt_template::PromptTemplate;
use crate::ai::{empty_response, http_client, require_key, send_json, PlanProvider};
use crate::config::Config;
use crate::error::Result;
use crate::plan::{parse_plan, Plan};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Google Gemini generateContent API
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiProvider {
    pub fn new(config: &Config) -> Self {
        let model = if config.model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model.clone()
        };
        Self {
            client: http_client(),
            api_key: config.api_key.clone(),
            endpoint: config.gemini_endpoint.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl PlanProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate_plan(&self, prompt: &str) -> Result<Plan> {
        require_key(self.name(), &self.api_key, "GEMINI_API_KEY")?;

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };
        tracing::debug!(model = %self.model, "requesting plan from gemini");

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&body);
        let response: GenerateContentResponse = send_json(self.name(), request).await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
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
