//! High-level test generation over any configured provider.

use tracing::{debug, info, warn};

use crate::LlmClient;
use crate::config::llm_model_config::LlmModelConfig;
use crate::error_handler::Result;
use crate::model::{GenerationOptions, TokenUsage};
use crate::parser::{parse_test_code, validate_test_code_structure};
use crate::prompts::test_fix::{TestFixContext, build_test_fix_prompt};
use crate::prompts::test_generation::{TestGenerationContext, build_test_generation_prompt};

/// Fallback temperature for fresh generation; kept low for consistent
/// output. `LlmModelConfig::temperature` overrides it.
const GENERATION_TEMPERATURE: f32 = 0.2;
/// Fallback temperature for fix attempts; lower still, the intent is
/// surgical repair.
const FIX_TEMPERATURE: f32 = 0.1;
const MAX_COMPLETION_TOKENS: u32 = 4000;

/// Extracted test code plus provider usage accounting.
#[derive(Debug, Clone)]
pub struct GeneratedTest {
    pub test_code: String,
    pub usage: Option<TokenUsage>,
}

/// Generates and repairs unit tests for extracted targets.
pub struct TestGenerator {
    client: LlmClient,
    max_fix_attempts: u32,
    generation_temperature: f32,
    fix_temperature: f32,
}

impl TestGenerator {
    /// Builds a generator over the provider named in `cfg`. The config's
    /// temperature, when set, replaces the generation fallback.
    pub fn new(cfg: LlmModelConfig, max_fix_attempts: u32) -> Result<Self> {
        let generation_temperature = cfg.temperature.unwrap_or(GENERATION_TEMPERATURE);
        Ok(Self {
            client: LlmClient::new(cfg)?,
            max_fix_attempts,
            generation_temperature,
            fix_temperature: FIX_TEMPERATURE,
        })
    }

    /// Replaces the fix-attempt temperature fallback. `None` keeps it.
    pub fn with_fix_temperature(mut self, temperature: Option<f32>) -> Self {
        if let Some(t) = temperature {
            self.fix_temperature = t;
        }
        self
    }

    pub fn max_fix_attempts(&self) -> u32 {
        self.max_fix_attempts
    }

    fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: Some(self.generation_temperature),
            max_tokens: Some(MAX_COMPLETION_TOKENS),
            stop_sequences: Vec::new(),
        }
    }

    fn fix_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: Some(self.fix_temperature),
            max_tokens: Some(MAX_COMPLETION_TOKENS),
            stop_sequences: Vec::new(),
        }
    }

    /// Generates test code for one target.
    ///
    /// Structural validation problems are logged as warnings, not failures:
    /// the test runner downstream is the real arbiter.
    pub async fn generate_test(&self, ctx: &TestGenerationContext<'_>) -> Result<GeneratedTest> {
        let target = ctx.target;
        info!(
            function = %target.function_name,
            file = %target.file_path,
            framework = ctx.framework.id(),
            "generating tests"
        );

        let messages = build_test_generation_prompt(ctx);
        debug!(function = %target.function_name, "sending test generation request");

        let response = self
            .client
            .generate(&messages, &self.generation_options())
            .await?;

        let test_code = parse_test_code(&response.content);
        let validation = validate_test_code_structure(&test_code, ctx.framework);
        if !validation.valid {
            warn!(
                function = %target.function_name,
                problems = %validation.errors.join(", "),
                "generated test code validation warnings"
            );
        }

        debug!(function = %target.function_name, "generated test code");
        Ok(GeneratedTest {
            test_code,
            usage: response.usage,
        })
    }

    /// Generates a corrected version of a failing test.
    pub async fn fix_test(&self, ctx: &TestFixContext<'_>) -> Result<GeneratedTest> {
        info!(
            attempt = ctx.attempt,
            max_attempts = ctx.max_attempts,
            "fixing failing test"
        );

        let messages = build_test_fix_prompt(ctx);
        debug!(attempt = ctx.attempt, "sending test fix request");

        let response = self.client.generate(&messages, &self.fix_options()).await?;

        let test_code = parse_test_code(&response.content);
        let validation = validate_test_code_structure(&test_code, ctx.framework);
        if !validation.valid {
            warn!(
                attempt = ctx.attempt,
                problems = %validation.errors.join(", "),
                "fixed test code validation warnings"
            );
        }

        Ok(GeneratedTest {
            test_code,
            usage: response.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::llm_provider::LlmProvider;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig::for_provider(LlmProvider::OpenAi, "sk-test")
    }

    #[test]
    fn unset_config_temperatures_fall_back_to_the_defaults() {
        let generator = TestGenerator::new(cfg(), 3).unwrap();
        assert_eq!(generator.generation_options().temperature, Some(0.2));
        assert_eq!(generator.fix_options().temperature, Some(0.1));
        assert_eq!(
            generator.generation_options().max_tokens,
            Some(MAX_COMPLETION_TOKENS)
        );
    }

    #[test]
    fn configured_temperatures_replace_the_fallbacks() {
        let mut model_cfg = cfg();
        model_cfg.temperature = Some(0.9);
        let generator = TestGenerator::new(model_cfg, 3)
            .unwrap()
            .with_fix_temperature(Some(0.4));
        assert_eq!(generator.generation_options().temperature, Some(0.9));
        assert_eq!(generator.fix_options().temperature, Some(0.4));
    }

    #[test]
    fn absent_fix_temperature_keeps_the_fallback() {
        let generator = TestGenerator::new(cfg(), 3)
            .unwrap()
            .with_fix_temperature(None);
        assert_eq!(generator.fix_options().temperature, Some(0.1));
    }
}
