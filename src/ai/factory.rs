use crate::ai::{
    anthropic::AnthropicProvider, gemini::GeminiProvider, gemini_cli::GeminiCliProvider,
    openai::OpenAiProvider, PlanProvider,
};
use crate::config::Config;
use std::sync::Arc;

/// 지원하는 provider 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Anthropic,
    GeminiCli,
}

impl ProviderKind {
    /// provider id 해석 (대소문자 무시). 비어 있거나 모르는 id는 Gemini
    pub fn from_id(id: &str) -> Self {
        match id.trim().to_lowercase().as_str() {
            "openai" => ProviderKind::OpenAi,
            "anthropic" => ProviderKind::Anthropic,
            "gemini-cli" => ProviderKind::GeminiCli,
            "gemini" | "" => ProviderKind::Gemini,
            other => {
                tracing::warn!(provider = other, "unknown provider, falling back to gemini");
                ProviderKind::Gemini
            }
        }
    }
}

/// Provider factory for creating plan providers from configuration
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider instance based on `config.provider`
    ///
    /// # Examples
    /// ```
    /// use wrtpilot::ai::factory::ProviderFactory;
    /// use wrtpilot::config::Config;
    ///
    /// let config = Config { provider: "anthropic".to_string(), ..Config::default() };
    /// assert_eq!(ProviderFactory::create(&config).name(), "anthropic");
    /// ```
    pub fn create(config: &Config) -> Arc<dyn PlanProvider> {
        match ProviderKind::from_id(&config.provider) {
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(config)),
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config)),
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config)),
            ProviderKind::GeminiCli => Arc::new(GeminiCliProvider::new(config)),
        }
    }

    /// Get a list of all supported provider names
    pub fn supported_providers() -> Vec<&'static str> {
        vec!["gemini", "openai", "anthropic", "gemini-cli"]
    }

    /// Check if a provider name is supported
    pub fn is_supported(provider_name: &str) -> bool {
        Self::supported_providers().contains(&provider_name.to_lowercase().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(provider: &str) -> Arc<dyn PlanProvider> {
        ProviderFactory::create(&Config {
            provider: provider.to_string(),
            ..Config::default()
        })
    }

    #[test]
    fn test_create_each_provider() {
        assert_eq!(create("gemini").name(), "gemini");
        assert_eq!(create("openai").name(), "openai");
        assert_eq!(create("anthropic").name(), "anthropic");
        assert_eq!(create("gemini-cli").name(), "gemini-cli");
    }

    #[test]
    fn test_unset_or_unknown_defaults_to_gemini() {
        assert_eq!(create("").name(), "gemini");
        assert_eq!(create("unknown").name(), "gemini");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(create("OpenAI").name(), "openai");
        assert_eq!(create("  Anthropic ").name(), "anthropic");
    }

    #[test]
    fn test_error_fix_support() {
        assert!(create("gemini").supports_error_fix());
        assert!(create("openai").supports_error_fix());
        assert!(create("anthropic").supports_error_fix());
        assert!(!create("gemini-cli").supports_error_fix());
    }

    #[test]
    fn test_is_supported() {
        assert!(ProviderFactory::is_supported("gemini"));
        assert!(ProviderFactory::is_supported("GEMINI-CLI"));
        assert!(!ProviderFactory::is_supported("codex"));
    }
}
