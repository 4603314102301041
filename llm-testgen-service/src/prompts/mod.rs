//! Prompt builders for test generation and test fixing.

pub mod test_fix;
pub mod test_generation;

use serde::{Deserialize, Serialize};

/// Target test framework for the generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestFramework {
    Jest,
    Vitest,
}

impl TestFramework {
    /// Lowercase identifier, as used in prompts and config values.
    pub fn id(self) -> &'static str {
        match self {
            TestFramework::Jest => "jest",
            TestFramework::Vitest => "vitest",
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            TestFramework::Jest => "Jest",
            TestFramework::Vitest => "Vitest",
        }
    }
}
