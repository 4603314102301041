//! Crate-wide error hierarchy for github-client.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type GithubClientResult<T> = Result<T, GithubClientError>;

/// Root error type for the github-client crate.
#[derive(Debug, Error)]
pub enum GithubClientError {
    /// Provider (GitHub REST) related failure.
    #[error(transparent)]
    Provider(#[from] GithubProviderError),

    /// Input validation errors (bad repo slugs, empty refs, etc.).
    #[error("validation error: {0}")]
    Validation(String),
}

/// Provider-specific error used inside the HTTP layer.
#[derive(Debug, Error)]
pub enum GithubProviderError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited {
        /// Optional `Retry-After` hint in seconds when available.
        retry_after_secs: Option<u64>,
    },

    /// Gateway / server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (non-2xx) not covered by specific variants.
    #[error("http status error: status {0}")]
    HttpStatus(u16),

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without HTTP status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected/invalid shape of a provider response.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl GithubProviderError {
    /// Whether retrying the same request can plausibly succeed.
    ///
    /// Only rate limiting and server-side 5xx responses qualify; auth
    /// failures, 404s and malformed responses are permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GithubProviderError::RateLimited { .. } | GithubProviderError::Server(_)
        )
    }
}

impl GithubClientError {
    /// See [`GithubProviderError::is_retryable`].
    pub fn is_retryable(&self) -> bool {
        match self {
            GithubClientError::Provider(p) => p.is_retryable(),
            GithubClientError::Validation(_) => false,
        }
    }
}

impl From<reqwest::Error> for GithubClientError {
    fn from(e: reqwest::Error) -> Self {
        GithubClientError::Provider(GithubProviderError::from(e))
    }
}

// ===== Mapping from reqwest::Error into GithubProviderError =====

impl From<reqwest::Error> for GithubProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return GithubProviderError::Timeout;
        }

        if let Some(status) = e.status() {
            let code = status.as_u16();
            return match code {
                401 => GithubProviderError::Unauthorized,
                403 => GithubProviderError::Forbidden,
                404 => GithubProviderError::NotFound,
                429 => GithubProviderError::RateLimited {
                    retry_after_secs: None,
                },
                500..=599 => GithubProviderError::Server(code),
                _ => GithubProviderError::HttpStatus(code),
            };
        }

        if e.is_decode() {
            return GithubProviderError::InvalidResponse(e.to_string());
        }

        GithubProviderError::Network(e.to_string())
    }
}
