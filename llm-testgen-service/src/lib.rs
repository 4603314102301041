//! LLM-backed unit test generation for extracted test targets.
//!
//! The crate is split by concern:
//! - [`config`] — provider selection and model parameters;
//! - [`services`] — thin non-streaming HTTP clients per provider;
//! - [`prompts`] — test-generation and test-fix message builders;
//! - [`parser`] — code extraction and structural validation of model output;
//! - [`generator`] — the high-level [`TestGenerator`] facade.
//!
//! [`LlmClient`] dispatches over the configured provider with a plain enum,
//! so no dynamic dispatch is involved.

pub mod config;
pub mod error_handler;
pub mod generator;
pub mod model;
pub mod parser;
pub mod prompts;
pub mod services;

pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use error_handler::{LlmTestgenError, Result};
pub use generator::{GeneratedTest, TestGenerator};
pub use model::{ChatMessage, ChatRole, GenerationOptions, LlmResponse, TokenUsage};
pub use prompts::TestFramework;

use crate::model::{ChatMessage as Message, GenerationOptions as Options};
use crate::services::anthropic_service::AnthropicService;
use crate::services::google_service::GoogleService;
use crate::services::open_ai_service::OpenAiService;

/// Provider-dispatching completion client.
#[derive(Debug)]
pub enum LlmClient {
    OpenAi(OpenAiService),
    Anthropic(AnthropicService),
    Google(GoogleService),
}

impl LlmClient {
    /// Builds the service matching `cfg.provider`.
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        match cfg.provider {
            LlmProvider::OpenAi => Ok(LlmClient::OpenAi(OpenAiService::new(cfg)?)),
            LlmProvider::Anthropic => Ok(LlmClient::Anthropic(AnthropicService::new(cfg)?)),
            LlmProvider::Google => Ok(LlmClient::Google(GoogleService::new(cfg)?)),
        }
    }

    /// Runs one non-streaming completion.
    pub async fn generate(&self, messages: &[Message], options: &Options) -> Result<LlmResponse> {
        match self {
            LlmClient::OpenAi(svc) => svc.generate(messages, options).await,
            LlmClient::Anthropic(svc) => svc.generate(messages, options).await,
            LlmClient::Google(svc) => svc.generate(messages, options).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_follows_the_configured_provider() {
        let cfg = LlmModelConfig::for_provider(LlmProvider::Anthropic, "key");
        let client = LlmClient::new(cfg).unwrap();
        assert!(matches!(client, LlmClient::Anthropic(_)));
    }
}
