//! OpenAI chat-completions service.
//!
//! Minimal, non-streaming client around the OpenAI REST API:
//! - POST {endpoint}/chat/completions
//!
//! Constructor validation:
//! - `cfg.provider` must be `LlmProvider::OpenAi`
//! - `cfg.api_key` must be non-empty
//! - `cfg.endpoint` must start with http:// or https://
//!
//! Errors are normalized via the unified types in `error_handler`.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        ConfigError, LlmTestgenError, Provider, ProviderError, ProviderErrorKind, Result,
        make_snippet,
    },
    model::{ChatMessage, ChatRole, GenerationOptions, LlmResponse, TokenUsage},
    services::{FALLBACK_MAX_TOKENS, FALLBACK_TEMPERATURE, build_http, validate_common},
};

/// Thin client for the OpenAI chat completions API.
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        if cfg.provider != LlmProvider::OpenAi {
            return Err(
                ProviderError::new(Provider::OpenAi, ProviderErrorKind::InvalidProvider).into(),
            );
        }
        if cfg.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey(Provider::OpenAi).into());
        }
        let base = validate_common(&cfg)?;
        let client = build_http(&cfg)?;
        let url_chat = format!("{base}/chat/completions");

        info!(
            provider = ?cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_chat,
        })
    }

    /// Performs a non-streaming chat completion request.
    pub async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<LlmResponse> {
        let started = Instant::now();

        let body = ChatCompletionRequest {
            model: &self.cfg.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: role_name(m.role),
                    content: &m.content,
                })
                .collect(),
            temperature: options
                .temperature
                .or(self.cfg.temperature)
                .unwrap_or(FALLBACK_TEMPERATURE),
            max_tokens: options
                .max_tokens
                .or(self.cfg.max_tokens)
                .unwrap_or(FALLBACK_MAX_TOKENS),
            stop: if options.stop_sequences.is_empty() {
                None
            } else {
                Some(&options.stop_sequences)
            },
        };

        debug!(
            model = %self.cfg.model,
            messages = messages.len(),
            "POST {}", self.url_chat
        );

        let resp = self
            .client
            .post(&self.url_chat)
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis() as u64,
                "OpenAI chat completion returned non-success status"
            );
            return Err(ProviderError::new(
                Provider::OpenAi,
                ProviderErrorKind::HttpStatus {
                    status,
                    url,
                    snippet,
                },
            )
            .into());
        }

        let out: ChatCompletionResponse = resp.json().await.map_err(|e| {
            LlmTestgenError::from(ProviderError::new(
                Provider::OpenAi,
                ProviderErrorKind::Decode(format!(
                    "serde error: {e}; expected `choices[0].message.content`"
                )),
            ))
        })?;

        let content = out
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| {
                ProviderError::new(Provider::OpenAi, ProviderErrorKind::EmptyCompletion)
            })?;

        let usage = out.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis() as u64,
            total_tokens = usage.and_then(|u| u.total_tokens),
            "chat completion completed"
        );

        Ok(LlmResponse { content, usage })
    }
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
    #[serde(default)]
    total_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::llm_model_config::LlmModelConfig;

    #[test]
    fn rejects_foreign_provider_and_missing_key() {
        let wrong = LlmModelConfig::for_provider(LlmProvider::Anthropic, "k");
        assert!(OpenAiService::new(wrong).is_err());

        let keyless = LlmModelConfig::for_provider(LlmProvider::OpenAi, "  ");
        assert!(OpenAiService::new(keyless).is_err());
    }

    #[test]
    fn response_decodes_choices_and_usage() {
        let raw = r#"{
            "choices": [{ "message": { "content": "describe('x', () => {});" } }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 40, "total_tokens": 160 }
        }"#;
        let out: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            out.choices[0].message.content.as_deref(),
            Some("describe('x', () => {});")
        );
        assert_eq!(out.usage.unwrap().total_tokens, Some(160));
    }
}
