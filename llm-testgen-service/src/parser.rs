//! Extraction of runnable test code from model output.
//!
//! Models are told to answer with bare code, but in practice wrap it in
//! markdown fences or preface it with prose. The parser peels those layers
//! in order: a whole-response fence, else the largest inline fenced block,
//! then known explanation preambles, then any residual fence markers. When
//! nothing survives, the raw response is returned so the caller can still
//! log or persist it.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::prompts::TestFramework;

static FULL_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^```(?:typescript|ts|javascript|js)?[^\S\n]*\n(.*?)\n```$")
        .expect("valid regex")
});

static INLINE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid regex"));

static EXPLANATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^here'?s?\s+(?:the\s+)?(?:test\s+)?code:?\s*",
        r"(?i)^test\s+code:?\s*",
        r"(?i)^generated\s+test:?\s*",
        r"(?i)^here\s+is\s+the\s+test:?\s*",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static ANY_FENCE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

static OPEN_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```\w*\n?").expect("valid regex"));

static CLOSE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n?```$").expect("valid regex"));

/// Extracts the test code from a raw model response.
///
/// Falls back to the untouched response when every stripping step leaves
/// nothing behind.
pub fn parse_test_code(response: &str) -> String {
    let mut code = response.trim().to_string();

    if let Some(caps) = FULL_FENCE.captures(&code) {
        code = caps[1].trim().to_string();
    } else {
        let largest = INLINE_FENCE
            .captures_iter(&code)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .max_by_key(|s| s.len());
        if let Some(block) = largest {
            code = block.trim().to_string();
        }
    }

    for pattern in EXPLANATION_PATTERNS.iter() {
        if pattern.is_match(&code) {
            code = pattern.replace(&code, "").trim().to_string();
            if let Some(block) = ANY_FENCE_BLOCK.find(&code) {
                code = block.as_str().to_string();
                code = OPEN_FENCE.replace(&code, "").to_string();
                code = CLOSE_FENCE.replace(&code, "").trim().to_string();
            }
        }
    }

    code = OPEN_FENCE.replace(&code, "").to_string();
    code = CLOSE_FENCE.replace(&code, "").trim().to_string();

    if code.is_empty() {
        warn!("failed to extract test code from model response");
        return response.to_string();
    }
    code
}

/// Structural validation outcome. Failed checks are warnings for the
/// caller, not hard errors: the code may still run.
#[derive(Debug)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

static TEST_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(describe|it|test)\s*\(").expect("valid regex"));

/// Cheap sanity checks that the extracted code looks like a test file for
/// the chosen framework.
pub fn validate_test_code_structure(code: &str, framework: TestFramework) -> ValidationReport {
    let mut errors = Vec::new();

    if !code.contains("describe") && !code.contains("it(") && !code.contains("test(") {
        errors.push("Missing test structure (describe/it/test)".to_string());
    }

    match framework {
        TestFramework::Jest => {
            // Jest globals need no import, so only flag fully bare output.
            let has_import = code.contains("from 'jest'")
                || code.contains("from \"jest\"")
                || code.contains("require(");
            if !has_import
                && !code.contains("describe")
                && !code.contains("it")
                && !code.contains("test")
            {
                errors.push("Missing Jest test functions".to_string());
            }
        }
        TestFramework::Vitest => {
            if !code.contains("from 'vitest'") && !code.contains("from \"vitest\"") {
                errors.push("Missing Vitest import".to_string());
            }
        }
    }

    if code.trim().len() < 20 {
        errors.push("Test code appears too short or empty".to_string());
    }

    if !TEST_CALL.is_match(code) {
        errors.push("Missing test function calls (describe/it/test)".to_string());
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_response_fence_is_unwrapped() {
        let raw = "```typescript\ndescribe('x', () => {\n  it('works', () => {});\n});\n```";
        assert_eq!(
            parse_test_code(raw),
            "describe('x', () => {\n  it('works', () => {});\n});"
        );
    }

    #[test]
    fn untagged_fence_is_unwrapped_too() {
        let raw = "```\nit('y', () => {});\n```";
        assert_eq!(parse_test_code(raw), "it('y', () => {});");
    }

    #[test]
    fn largest_inline_block_wins() {
        let raw = "Sure!\n```\nshort\n```\nand the real one:\n```\ndescribe('big', () => {\n  it('a', () => {});\n});\n```";
        let code = parse_test_code(raw);
        assert!(code.contains("describe('big'"));
        assert!(!code.contains("Sure!"));
    }

    #[test]
    fn explanation_preamble_is_stripped() {
        let raw = "Here's the test code: it('z', () => { expect(1).toBe(1); });";
        assert_eq!(
            parse_test_code(raw),
            "it('z', () => { expect(1).toBe(1); });"
        );
    }

    #[test]
    fn bare_code_passes_through_unchanged() {
        let raw = "describe('plain', () => {\n  it('ok', () => {});\n});";
        assert_eq!(parse_test_code(raw), raw);
    }

    #[test]
    fn unextractable_response_is_returned_verbatim() {
        let raw = "``````";
        assert_eq!(parse_test_code(raw), raw);
    }

    #[test]
    fn vitest_code_without_import_is_flagged() {
        let code = "describe('x', () => { it('a', () => {}); });";
        let report = validate_test_code_structure(code, TestFramework::Vitest);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("Vitest import")));
    }

    #[test]
    fn complete_vitest_file_validates() {
        let code = "import { describe, it, expect } from 'vitest';\n\ndescribe('x', () => {\n  it('a', () => { expect(1).toBe(1); });\n});";
        let report = validate_test_code_structure(code, TestFramework::Vitest);
        assert!(report.valid, "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn short_output_is_flagged() {
        let report = validate_test_code_structure("it('a')", TestFramework::Jest);
        assert!(!report.valid);
    }
}
