//! Function-level test target extraction for pull requests.
//!
//! Pipeline stages:
//! 1. [`diff`] — parse per-file unified diff patches into hunks, replay them
//!    into merged changed line ranges.
//! 2. [`ast`] — tree-sitter extraction of testable function declarations
//!    from TypeScript / JavaScript sources.
//! 3. [`map`] — overlap matching between addition ranges and function spans,
//!    producing [`TestTarget`] records.
//! 4. [`context`] + [`locate`] — surrounding-code excerpts for prompting and
//!    discovery of pre-existing test files.
//!
//! The crate talks to the repository only through the [`RepoFiles`] trait, so
//! it stays independent of any concrete hosting provider. The entry point is
//! [`extract_test_targets`], which runs the full pipeline over one pull
//! request's changed files with per-file failure isolation.

pub mod ast;
pub mod context;
pub mod diff;
pub mod errors;
pub mod locate;
pub mod map;

#[cfg(test)]
pub(crate) mod testutil;

pub use ast::{FunctionKind, FunctionRecord, extract_functions};
pub use diff::{ChangedRange, DiffHunk, FileDiff, FileStatus, RangeKind};
pub use errors::{CapabilityError, ConfigError, EngineResult, Error};
pub use map::TestTarget;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Read access to repository files at a given git ref.
///
/// Implemented by the hosting-provider client in the application crate and
/// by an in-memory store in tests.
pub trait RepoFiles {
    /// Full decoded content of `path` at `git_ref`.
    fn fetch_content(
        &self,
        git_ref: &str,
        path: &str,
    ) -> impl Future<Output = Result<String, CapabilityError>>;

    /// Whether `path` exists at `git_ref`. Missing files are `Ok(false)`,
    /// not an error.
    fn file_exists(
        &self,
        git_ref: &str,
        path: &str,
    ) -> impl Future<Output = Result<bool, CapabilityError>>;
}

/// One changed file of a pull request, as reported by the provider's
/// list-files endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedFile {
    pub filename: String,
    /// Provider status string (`added`, `modified`, `removed`, `renamed`).
    pub status: String,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
    /// Unified diff body for this file. Absent for binary or very large
    /// files.
    #[serde(default)]
    pub patch: Option<String>,
    #[serde(default)]
    pub previous_filename: Option<String>,
}

/// Settings for the extraction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractorConfig {
    /// Glob patterns a filename must match to be analyzed.
    pub include_patterns: Vec<String>,
    /// Glob patterns that drop a filename even when included.
    pub exclude_patterns: Vec<String>,
    /// Root directory probed for existing tests, also used as a naming base
    /// for new test files.
    pub test_directory: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
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
            test_directory: "__tests__".to_string(),
        }
    }
}

/// Translate a simple glob into an unanchored regex: `**` matches across
/// directory separators, `*` within one path segment. Other characters pass
/// through untouched, so a literal dot stays a regex dot; the resulting
/// match is deliberately lenient.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, ConfigError> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                translated.push_str(".*");
            } else {
                translated.push_str("[^/]*");
            }
        } else {
            translated.push(c);
        }
    }
    Regex::new(&translated).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Compiled include/exclude filters.
struct FileFilters {
    includes: Vec<Regex>,
    excludes: Vec<Regex>,
}

impl FileFilters {
    fn compile(config: &ExtractorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            includes: config
                .include_patterns
                .iter()
                .map(|p| glob_to_regex(p))
                .collect::<Result<_, _>>()?,
            excludes: config
                .exclude_patterns
                .iter()
                .map(|p| glob_to_regex(p))
                .collect::<Result<_, _>>()?,
        })
    }

    fn selects(&self, path: &str) -> bool {
        self.includes.iter().any(|r| r.is_match(path))
            && !self.excludes.iter().any(|r| r.is_match(path))
    }
}

/// Parse provider file entries into per-file diffs.
///
/// Files without a TypeScript/JavaScript extension are dropped up front;
/// entries without a patch (binary or oversized) keep an empty hunk list so
/// status-based handling still applies.
pub fn parse_changed_files(files: &[ChangedFile]) -> Vec<FileDiff> {
    let mut diffs = Vec::with_capacity(files.len());
    for file in files {
        let supported = [".ts", ".tsx", ".js", ".jsx"]
            .iter()
            .any(|ext| file.filename.ends_with(ext));
        if !supported {
            continue;
        }

        let hunks = match &file.patch {
            Some(patch) => diff::parse_unified_diff(patch),
            None => Vec::new(),
        };
        debug!(file = %file.filename, hunks = hunks.len(), "parsed file diff");
        diffs.push(FileDiff {
            filename: file.filename.clone(),
            status: FileStatus::from_provider(&file.status),
            hunks,
            additions: file.additions,
            deletions: file.deletions,
        });
    }
    diffs
}

/// Run the full extraction pipeline over a pull request's changed files.
///
/// Bad filter patterns abort the run; any other failure is scoped to the
/// file that caused it, which is logged and skipped while the rest of the
/// batch proceeds. Output order follows the input file order, functions in
/// document order within each file.
pub async fn extract_test_targets<S: RepoFiles>(
    store: &S,
    head_ref: &str,
    files: &[ChangedFile],
    config: &ExtractorConfig,
) -> EngineResult<Vec<TestTarget>> {
    info!(files = files.len(), "analyzing changed files for test targets");

    let filters = FileFilters::compile(config)?;
    let diffs = parse_changed_files(files);

    let mut targets = Vec::new();
    for file_diff in &diffs {
        if !filters.selects(&file_diff.filename) {
            debug!(file = %file_diff.filename, "filtered out by include/exclude patterns");
            continue;
        }
        if file_diff.status == FileStatus::Removed {
            continue;
        }

        match analyze_file(store, head_ref, file_diff, &config.test_directory).await {
            Ok(found) => {
                if !found.is_empty() {
                    info!(file = %file_diff.filename, targets = found.len(), "test targets found");
                }
                targets.extend(found);
            }
            Err(err) => {
                warn!(file = %file_diff.filename, error = %err, "skipping file after analysis failure");
            }
        }
    }

    if let Ok(dump) = serde_json::to_string(&targets) {
        debug!(targets = %dump, "extracted test targets");
    }
    info!(total = targets.len(), "test target extraction finished");
    Ok(targets)
}

/// Analyze one changed file: fetch content, replay the diff, extract
/// functions, probe for an existing test file, and match overlaps.
async fn analyze_file<S: RepoFiles>(
    store: &S,
    head_ref: &str,
    file_diff: &FileDiff,
    test_directory: &str,
) -> EngineResult<Vec<TestTarget>> {
    let content = store.fetch_content(head_ref, &file_diff.filename).await?;

    let ranges = diff::changed_ranges(file_diff, Some(&content))?;
    if ranges.is_empty() {
        return Ok(Vec::new());
    }

    let functions = ast::extract_functions(&file_diff.filename, &content)?;
    let existing_test_file =
        locate::detect_test_file(store, head_ref, &file_diff.filename, test_directory).await?;

    Ok(map::build_targets(
        &file_diff.filename,
        &content,
        &functions,
        &ranges,
        existing_test_file.as_deref(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockRepo;

    const UTILS_SRC: &str = "\
export function formatDate(d: Date): string {
  return d.toISOString();
}

export function computeTotal(items: number[]): number {
  let total = 0;
  for (const item of items) {
    total += item;
  }
  return total;
}";

    // Adds the loop body (new-file lines 7-9) inside computeTotal.
    const UTILS_PATCH: &str = "\
@@ -5,4 +5,7 @@
 export function computeTotal(items: number[]): number {
   let total = 0;
+  for (const item of items) {
+    total += item;
+  }
   return total;
 }";

    fn utils_file() -> ChangedFile {
        ChangedFile {
            filename: "src/utils.ts".to_string(),
            status: "modified".to_string(),
            additions: 3,
            deletions: 0,
            patch: Some(UTILS_PATCH.to_string()),
            previous_filename: None,
        }
    }

    #[test]
    fn glob_translation_keeps_dots_and_limits_single_star_to_a_segment() {
        let re = glob_to_regex("**/*.ts").unwrap();
        assert_eq!(re.as_str(), ".*/[^/]*.ts");
        assert!(re.is_match("src/utils.ts"));
        assert!(re.is_match("a/b/c/utils.ts"));
        assert!(!re.is_match("utils.ts"));
    }

    #[test]
    fn filters_drop_tests_and_node_modules() {
        let filters = FileFilters::compile(&ExtractorConfig::default()).unwrap();
        assert!(filters.selects("src/utils.ts"));
        assert!(filters.selects("src/View.tsx"));
        assert!(!filters.selects("src/utils.test.ts"));
        assert!(!filters.selects("src/utils.spec.js"));
        assert!(!filters.selects("a/node_modules/pkg/index.js"));
    }

    #[test]
    fn prefilter_skips_non_source_extensions() {
        let files = vec![ChangedFile {
            filename: "docs/readme.md".to_string(),
            status: "modified".to_string(),
            additions: 1,
            deletions: 0,
            patch: Some("@@ -1 +1 @@\n-a\n+b".to_string()),
            previous_filename: None,
        }];
        assert!(parse_changed_files(&files).is_empty());
    }

    #[tokio::test]
    async fn end_to_end_targets_only_the_changed_function() {
        let repo = MockRepo::default().with_file("src/utils.ts", UTILS_SRC);
        let targets = extract_test_targets(
            &repo,
            "feature-head",
            &[utils_file()],
            &ExtractorConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(targets.len(), 1);
        let target = &targets[0];
        assert_eq!(target.function_name, "computeTotal");
        assert_eq!(target.function_type, FunctionKind::Function);
        assert_eq!((target.start_line, target.end_line), (5, 11));
        assert!(target.code.starts_with("export function computeTotal"));
        assert_eq!(target.existing_test_file, None);
        assert_eq!(target.changed_ranges.len(), 1);
        assert_eq!(
            (target.changed_ranges[0].start, target.changed_ranges[0].end),
            (7, 9)
        );
    }

    #[tokio::test]
    async fn targets_serialize_for_the_debug_dump() {
        let repo = MockRepo::default().with_file("src/utils.ts", UTILS_SRC);
        let targets = extract_test_targets(
            &repo,
            "feature-head",
            &[utils_file()],
            &ExtractorConfig::default(),
        )
        .await
        .unwrap();

        let dump = serde_json::to_string(&targets).unwrap();
        assert!(dump.contains("\"function_name\":\"computeTotal\""));
        assert!(dump.contains("\"function_type\":\"function\""));
        assert!(dump.contains("\"changed_ranges\""));
    }

    #[tokio::test]
    async fn end_to_end_attaches_discovered_test_file() {
        let repo = MockRepo::default()
            .with_file("src/utils.ts", UTILS_SRC)
            .with_file("src/__tests__/utils.test.ts", "describe('utils', () => {});");
        let targets = extract_test_targets(
            &repo,
            "feature-head",
            &[utils_file()],
            &ExtractorConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(
            targets[0].existing_test_file.as_deref(),
            Some("src/__tests__/utils.test.ts")
        );
    }

    #[tokio::test]
    async fn fetch_failure_skips_the_file_but_not_the_batch() {
        let repo = MockRepo::default()
            .with_failing("src/bad.ts")
            .with_file("src/utils.ts", UTILS_SRC);
        let bad = ChangedFile {
            filename: "src/bad.ts".to_string(),
            status: "modified".to_string(),
            additions: 1,
            deletions: 0,
            patch: Some("@@ -1 +1,2 @@\n a\n+b".to_string()),
            previous_filename: None,
        };

        let targets = extract_test_targets(
            &repo,
            "feature-head",
            &[bad, utils_file()],
            &ExtractorConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].file_path, "src/utils.ts");
    }

    #[tokio::test]
    async fn removed_files_are_skipped_without_fetching() {
        let repo = MockRepo::default();
        let removed = ChangedFile {
            filename: "src/gone.ts".to_string(),
            status: "removed".to_string(),
            additions: 0,
            deletions: 12,
            patch: None,
            previous_filename: None,
        };

        let targets =
            extract_test_targets(&repo, "head", &[removed], &ExtractorConfig::default())
                .await
                .unwrap();
        assert!(targets.is_empty());
    }

    #[tokio::test]
    async fn invalid_pattern_aborts_the_run() {
        let repo = MockRepo::default();
        let config = ExtractorConfig {
            include_patterns: vec!["[".to_string()],
            ..ExtractorConfig::default()
        };

        let err = extract_test_targets(&repo, "head", &[utils_file()], &config)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::InvalidPattern { .. })));
    }
}
