//! LLM Client abstractions and provider management
//!
//! - **Gemini**: `generateContent` / `streamGenerateContent` (default)
//! - **OpenAI**: any OpenAI-compatible `/chat/completions` endpoint

use crate::types::{AppError, Result};
use crate::utils::toml_config::LlmConfig;
use async_trait::async_trait;

/// Incremental completion text.
pub type TokenStream = Box<dyn futures::Stream<Item = Result<String>> + Send + Unpin>;

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a full completion with a system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Stream a completion with a system prompt
    async fn stream_with_system(&self, system: &str, prompt: &str) -> Result<TokenStream>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// Google Gemini (Generative Language API)
    ///
    /// ```rust,ignore
    /// let provider = Provider::Gemini {
    ///     api_key: "AIza...".to_string(),
    ///     api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
    ///     model: "gemini-1.5-flash".to_string(),
    ///     temperature: 0.7,
    /// };
    /// ```
    Gemini {
        api_key: String,
        api_base: String,
        model: String,
        temperature: f32,
    },

    /// OpenAI API provider (including compatible gateways)
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
        temperature: f32,
    },
}

impl Provider {
    /// Build from the `[llm]` section with an already resolved key.
    pub fn from_config(config: &LlmConfig, api_key: String) -> Self {
        match config {
            LlmConfig::Gemini {
                api_base,
                model,
                temperature,
                ..
            } => Provider::Gemini {
                api_key,
                api_base: api_base.clone(),
                model: model.clone(),
                temperature: *temperature,
            },
            LlmConfig::OpenAI {
                api_base,
                model,
                temperature,
                ..
            } => Provider::OpenAI {
                api_key,
                api_base: api_base.clone(),
                model: model.clone(),
                temperature: *temperature,
            },
        }
    }

    /// Create a client instance for this provider
    pub fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::Gemini {
                api_key,
                api_base,
                model,
                temperature,
            } => {
                if model.trim().is_empty() {
                    return Err(AppError::Configuration("Gemini model is empty".to_string()));
                }
                Ok(Box::new(super::gemini::GeminiClient::new(
                    api_key.clone(),
                    api_base.clone(),
                    model.clone(),
                    *temperature,
                )))
            }
            Provider::OpenAI {
                api_key,
                api_base,
                model,
                temperature,
            } => {
                if model.trim().is_empty() {
                    return Err(AppError::Configuration("OpenAI model is empty".to_string()));
                }
                Ok(Box::new(super::openai::OpenAIClient::new(
                    api_key.clone(),
                    api_base.clone(),
                    model.clone(),
                    *temperature,
                )))
            }
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "Gemini",
            Provider::OpenAI { .. } => "OpenAI",
        }
    }
}

/// Read the error body of a failed provider call.
pub(crate) async fn error_from_response(response: reqwest::Response) -> AppError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    AppError::LLM(format!("Provider returned {}: {}", status, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_keeps_model() {
        let provider = Provider::from_config(&LlmConfig::default(), "key".to_string());
        assert_eq!(provider.name(), "Gemini");
        let client = provider.create_client().unwrap();
        assert_eq!(client.model_name(), "gemini-1.5-flash");
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let provider = Provider::OpenAI {
            api_key: "k".to_string(),
            api_base: "http://localhost".to_string(),
            model: " ".to_string(),
            temperature: 0.2,
        };
        assert!(provider.create_client().is_err());
    }
}
