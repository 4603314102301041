//! Google Gemini generateContent service.
//!
//! Minimal, non-streaming client around the Generative Language REST API:
//! - POST {endpoint}/models/{model}:generateContent?key={api_key}
//!
//! The system message becomes a `systemInstruction`; assistant turns map to
//! the `model` role. Authentication is a query parameter, not a header.

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

/// Thin client for the Gemini generateContent API.
#[derive(Debug)]
pub struct GoogleService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_generate: String,
}

impl GoogleService {
    /// Creates a new [`GoogleService`] from the given config.
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        if cfg.provider != LlmProvider::Google {
            return Err(
                ProviderError::new(Provider::Google, ProviderErrorKind::InvalidProvider).into(),
            );
        }
        if cfg.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey(Provider::Google).into());
        }
        let base = validate_common(&cfg)?;
        let client = build_http(&cfg)?;
        let url_generate = format!("{base}/models/{}:generateContent", cfg.model);

        info!(
            provider = ?cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            "GoogleService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_generate,
        })
    }

    /// Performs a non-streaming generateContent request.
    pub async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<LlmResponse> {
        let started = Instant::now();

        let system_instruction = messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| Instruction {
                parts: vec![Part { text: &m.content }],
            });
        let contents: Vec<Content> = messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| Content {
                role: if m.role == ChatRole::Assistant {
                    "model"
                } else {
                    "user"
                },
                parts: vec![Part { text: &m.content }],
            })
            .collect();

        let body = GenerateContentRequest {
            contents,
            generation_config: GenerationConfig {
                temperature: options
                    .temperature
                    .or(self.cfg.temperature)
                    .unwrap_or(FALLBACK_TEMPERATURE),
                max_output_tokens: options
                    .max_tokens
                    .or(self.cfg.max_tokens)
                    .unwrap_or(FALLBACK_MAX_TOKENS),
                stop_sequences: if options.stop_sequences.is_empty() {
                    None
                } else {
                    Some(&options.stop_sequences)
                },
            },
            system_instruction,
        };

        debug!(
            model = %self.cfg.model,
            messages = messages.len(),
            "POST {}", self.url_generate
        );

        let resp = self
            .client
            .post(&self.url_generate)
            .query(&[("key", self.cfg.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_generate.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis() as u64,
                "Google generateContent returned non-success status"
            );
            return Err(ProviderError::new(
                Provider::Google,
                ProviderErrorKind::HttpStatus {
                    status,
                    url,
                    snippet,
                },
            )
            .into());
        }

        let out: GenerateContentResponse = resp.json().await.map_err(|e| {
            LlmTestgenError::from(ProviderError::new(
                Provider::Google,
                ProviderErrorKind::Decode(format!(
                    "serde error: {e}; expected `candidates[0].content.parts[].text`"
                )),
            ))
        })?;

        let first = out.candidates.into_iter().next().ok_or_else(|| {
            ProviderError::new(Provider::Google, ProviderErrorKind::EmptyCompletion)
        })?;
        let content = first
            .content
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        let usage = out.usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        });

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis() as u64,
            total_tokens = usage.and_then(|u| u.total_tokens),
            "generateContent completed"
        );

        Ok(LlmResponse { content, usage })
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Instruction<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Instruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
    #[serde(default)]
    total_token_count: Option<u32>,
}
