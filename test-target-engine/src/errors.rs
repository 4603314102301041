//! Crate-wide error hierarchy for test-target-engine.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - Nested domain enums (diff/ast/capability/config) instead of one flat list.
//! - No dynamic dispatch, ergonomic `?` via `From` impls.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type EngineResult<T> = Result<T, Error>;

/// Root error type for the test-target-engine crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Changed-range computation failure.
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// Source parsing / function extraction failure.
    #[error(transparent)]
    Ast(#[from] AstError),

    /// Injected capability (content fetch / existence probe) failure.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Configuration problems (bad include/exclude patterns).
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Changed-range computation errors.
#[derive(Debug, Error)]
pub enum DiffError {
    /// `added` files need the new content to compute a whole-file range.
    #[error("content required for added file: {0}")]
    MissingContent(String),
}

/// Source parsing errors.
#[derive(Debug, Error)]
pub enum AstError {
    /// Tree-sitter rejected the grammar.
    #[error("tree-sitter language init failed")]
    Language,

    /// Tree-sitter returned no tree for the source.
    #[error("tree-sitter parse failed: {0}")]
    Parse(String),

    /// File extension maps to no supported grammar.
    #[error("unsupported source extension: {0}")]
    UnsupportedExtension(String),
}

/// Failures of the injected repository capabilities.
///
/// The orchestrator treats these as per-file problems: the file is logged
/// and skipped, the batch continues.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The requested path does not exist at the given ref.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport-level failure (network, auth, decode).
    #[error("transport error: {0}")]
    Transport(String),
}

/// Configuration and setup errors.
///
/// These surface at batch setup and abort the whole run, unlike per-file
/// failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An include/exclude glob produced an uncompilable regex.
    #[error("invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}
