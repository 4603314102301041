//! Thin non-streaming clients for the supported provider APIs.

pub mod anthropic_service;
pub mod google_service;
pub mod open_ai_service;

use std::time::Duration;

use crate::config::llm_model_config::LlmModelConfig;
use crate::error_handler::{ConfigError, Result};

/// Default request timeout when the config names none.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Fallback generation parameters, applied when neither the call options
/// nor the model config set them.
pub(crate) const FALLBACK_TEMPERATURE: f32 = 0.2;
pub(crate) const FALLBACK_MAX_TOKENS: u32 = 4000;

/// Shared constructor checks: non-empty model and key, http(s) endpoint.
/// Returns the endpoint base with any trailing slash removed.
pub(crate) fn validate_common(cfg: &LlmModelConfig) -> Result<String> {
    if cfg.model.trim().is_empty() {
        return Err(ConfigError::EmptyModel.into());
    }
    let endpoint = cfg.endpoint.trim();
    if endpoint.is_empty()
        || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
    {
        return Err(ConfigError::InvalidEndpoint(cfg.endpoint.clone()).into());
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

/// HTTP client with the configured timeout.
pub(crate) fn build_http(cfg: &LlmModelConfig) -> Result<reqwest::Client> {
    let timeout = cfg
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}
