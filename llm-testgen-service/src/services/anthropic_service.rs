//! Anthropic messages service.
//!
//! Minimal, non-streaming client around the Anthropic REST API:
//! - POST {endpoint}/messages
//!
//! The system message is lifted out of the conversation into the dedicated
//! `system` field, as the messages API requires. Authentication uses the
//! `x-api-key` header plus a pinned `anthropic-version`.

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

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Thin client for the Anthropic messages API.
#[derive(Debug)]
pub struct AnthropicService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_messages: String,
}

impl AnthropicService {
    /// Creates a new [`AnthropicService`] from the given config.
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        if cfg.provider != LlmProvider::Anthropic {
            return Err(
                ProviderError::new(Provider::Anthropic, ProviderErrorKind::InvalidProvider).into(),
            );
        }
        if cfg.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey(Provider::Anthropic).into());
        }
        let base = validate_common(&cfg)?;
        let client = build_http(&cfg)?;
        let url_messages = format!("{base}/messages");

        info!(
            provider = ?cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            "AnthropicService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_messages,
        })
    }

    /// Performs a non-streaming messages request.
    pub async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<LlmResponse> {
        let started = Instant::now();

        let system = messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str());
        let conversation: Vec<WireMessage> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| WireMessage {
                role: if m.role == ChatRole::Assistant {
                    "assistant"
                } else {
                    "user"
                },
                content: &m.content,
            })
            .collect();

        let body = MessagesRequest {
            model: &self.cfg.model,
            max_tokens: options
                .max_tokens
                .or(self.cfg.max_tokens)
                .unwrap_or(FALLBACK_MAX_TOKENS),
            temperature: options
                .temperature
                .or(self.cfg.temperature)
                .unwrap_or(FALLBACK_TEMPERATURE),
            messages: conversation,
            system,
            stop_sequences: if options.stop_sequences.is_empty() {
                None
            } else {
                Some(&options.stop_sequences)
            },
        };

        debug!(
            model = %self.cfg.model,
            messages = messages.len(),
            "POST {}", self.url_messages
        );

        let resp = self
            .client
            .post(&self.url_messages)
            .header("x-api-key", &self.cfg.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_messages.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis() as u64,
                "Anthropic messages returned non-success status"
            );
            return Err(ProviderError::new(
                Provider::Anthropic,
                ProviderErrorKind::HttpStatus {
                    status,
                    url,
                    snippet,
                },
            )
            .into());
        }

        let out: MessagesResponse = resp.json().await.map_err(|e| {
            LlmTestgenError::from(ProviderError::new(
                Provider::Anthropic,
                ProviderErrorKind::Decode(format!("serde error: {e}; expected `content[].text`")),
            ))
        })?;

        if out.content.is_empty() {
            return Err(ProviderError::new(
                Provider::Anthropic,
                ProviderErrorKind::EmptyCompletion,
            )
            .into());
        }

        let content = out
            .content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let usage = out.usage.map(|u| TokenUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: match (u.input_tokens, u.output_tokens) {
                (Some(i), Some(o)) => Some(i + o),
                _ => None,
            },
        });

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis() as u64,
            total_tokens = usage.and_then(|u| u.total_tokens),
            "messages completion completed"
        );

        Ok(LlmResponse { content, usage })
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: Option<u32>,
    #[serde(default)]
    output_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_moves_to_the_dedicated_field() {
        let messages = vec![
            ChatMessage::system("you write tests"),
            ChatMessage::user("generate tests"),
        ];
        let system = messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str());
        let rest: Vec<_> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .collect();

        assert_eq!(system, Some("you write tests"));
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn response_joins_content_blocks() {
        let raw = r#"{
            "content": [{ "text": "line one" }, { "text": "line two" }],
            "usage": { "input_tokens": 10, "output_tokens": 5 }
        }"#;
        let out: MessagesResponse = serde_json::from_str(raw).unwrap();
        let joined = out
            .content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(joined, "line one\nline two");
    }
}
