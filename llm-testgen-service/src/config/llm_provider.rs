//! Provider selection for test generation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error_handler::ConfigError;

/// Represents the backend used for LLM inference.
///
/// Adding more providers later (e.g., Mistral, local runtimes) is done by
/// extending this enum and wiring a matching service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// OpenAI chat completions API.
    OpenAi,
    /// Anthropic messages API.
    Anthropic,
    /// Google Gemini generateContent API.
    Google,
}

impl LlmProvider {
    /// Model used when the configuration names none.
    pub fn default_model(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-4-turbo-preview",
            LlmProvider::Anthropic => "claude-3-5-sonnet-20241022",
            LlmProvider::Google => "gemini-1.5-pro",
        }
    }

    /// Public API root for the provider.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "https://api.openai.com/v1",
            LlmProvider::Anthropic => "https://api.anthropic.com/v1",
            LlmProvider::Google => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "anthropic" => Ok(LlmProvider::Anthropic),
            "google" => Ok(LlmProvider::Google),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
