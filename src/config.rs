//! Runtime configuration for the test-generation pipeline.
//!
//! Sources, lowest to highest precedence:
//! 1. built-in defaults,
//! 2. optional `.testgen.config.json` at the working directory root,
//! 3. environment variables (`TESTGEN_API_KEY`, `GITHUB_TOKEN`,
//!    `TESTGEN_PROVIDER`, `TESTGEN_MODEL`, `TESTGEN_DEBUG`), typically
//!    loaded from `.env` by the binary before this runs.

use std::fs;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use llm_testgen_service::{LlmProvider, TestFramework};

const CONFIG_FILE: &str = ".testgen.config.json";
const MAX_FIX_ATTEMPTS_CAP: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but is not valid JSON for the schema.
    #[error("failed to parse {CONFIG_FILE}: {0}")]
    Parse(#[from] serde_json::Error),

    /// No API key in any source.
    #[error(
        "missing required API key. Provide it via {CONFIG_FILE} (apiKey) \
         or the TESTGEN_API_KEY environment variable"
    )]
    MissingApiKey,

    /// `TESTGEN_PROVIDER` or the config named an unknown provider.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),
}

/// Where generated test files are placed when no existing test file was
/// found for the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestLocation {
    /// Under the configured test directory.
    Separate,
    /// Next to the source file.
    CoLocated,
}

/// How generated files reach the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitStrategy {
    /// Commit straight onto the pull request's head branch.
    Direct,
    /// Commit to a dedicated `testgen/pr-<n>` branch and open a PR.
    BranchPr,
}

/// Full pipeline configuration. Field names follow the JSON config file's
/// camelCase convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestgenConfig {
    /// LLM provider API key. Required; may come from the environment.
    pub api_key: String,
    pub github_token: Option<String>,
    pub provider: Option<LlmProvider>,
    /// Model override; provider default applies when unset.
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub fix_temperature: Option<f32>,
    /// Clamped to `0..=5` after loading.
    pub max_fix_attempts: u32,
    pub framework: TestFramework,
    pub test_location: TestLocation,
    pub test_directory: String,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_tests_per_pr: usize,
    pub enable_auto_commit: bool,
    pub commit_strategy: CommitStrategy,
    pub enable_pr_comments: bool,
    pub debug: bool,
}

impl Default for TestgenConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            github_token: None,
            provider: None,
            model: None,
            max_tokens: None,
            temperature: None,
            fix_temperature: None,
            max_fix_attempts: 3,
            framework: TestFramework::Jest,
            test_location: TestLocation::Separate,
            test_directory: "__tests__".to_string(),
            include_patterns: vec![
                "**/*.ts".to_string(),
                "**/*.tsx".to_string(),
                "**/*.js".to_string(),
                "**/*.jsx".to_string(),
            ],
            exclude_patterns: vec![
                "**/*.test.ts".to_string(),
                "**/*.spec.ts".to_string(),
                "**/*.test.js".to_string(),
                "**/*.spec.js".to_string(),
                "**/node_modules/**".to_string(),
            ],
            max_tests_per_pr: 50,
            enable_auto_commit: true,
            commit_strategy: CommitStrategy::Direct,
            enable_pr_comments: true,
            debug: false,
        }
    }
}

impl TestgenConfig {
    /// Loads configuration from `.testgen.config.json` (when present) and
    /// merges environment overrides on top.
    pub fn load() -> Result<Self, ConfigError> {
        // Runs before the subscriber is installed, so no logging here.
        let mut cfg = match fs::read_to_string(CONFIG_FILE) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(_) => TestgenConfig::default(),
        };
        cfg.merge_env()?;
        cfg.max_fix_attempts = cfg.max_fix_attempts.min(MAX_FIX_ATTEMPTS_CAP);

        if cfg.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(cfg)
    }

    fn merge_env(&mut self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty()
            && let Ok(key) = std::env::var("TESTGEN_API_KEY")
        {
            self.api_key = key;
        }
        if self.github_token.is_none()
            && let Ok(token) = std::env::var("GITHUB_TOKEN")
        {
            self.github_token = Some(token);
        }
        if self.provider.is_none()
            && let Ok(name) = std::env::var("TESTGEN_PROVIDER")
        {
            self.provider = Some(
                name.parse()
                    .map_err(|_| ConfigError::UnsupportedProvider(name))?,
            );
        }
        if self.model.is_none()
            && let Ok(model) = std::env::var("TESTGEN_MODEL")
        {
            self.model = Some(model);
        }
        if std::env::var("TESTGEN_DEBUG").is_ok_and(|v| v == "true") {
            self.debug = true;
        }
        Ok(())
    }

    /// The provider to use, defaulting to OpenAI.
    pub fn provider_or_default(&self) -> LlmProvider {
        self.provider.unwrap_or(LlmProvider::OpenAi)
    }
}
