//! Unified diff parsing and changed-range computation.
//!
//! This module turns one file's patch text into hunks and then into merged,
//! line-addressed changed ranges. Addition ranges live in the *new* file's
//! coordinate space, deletion ranges in the *old* file's.
//!
//! The parser is deliberately lenient: it only understands hunk headers of
//! the form `@@ -<old_start>[,<old_lines>] +<new_start>[,<new_lines>] @@`.
//! Lines that precede the first header are ignored, malformed headers are
//! skipped, and unparseable regions simply contribute no hunks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{DiffError, EngineResult};

/// Maximum line gap (inclusive) within which two same-type ranges are merged
/// into one logical changed region. Example: gap=2 merges `[5,5]` and `[7,7]`.
const MERGE_FUZZ_LINES: u32 = 2;

/// File-level change status as reported by the repository provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl FileStatus {
    /// Map a provider status string to a known status.
    ///
    /// Unknown statuses (`changed`, `copied`, ...) are treated as modified:
    /// they have a patch and existing content, which is all the range
    /// computation cares about.
    pub fn from_provider(s: &str) -> Self {
        match s {
            "added" => FileStatus::Added,
            "removed" => FileStatus::Removed,
            "renamed" => FileStatus::Renamed,
            _ => FileStatus::Modified,
        }
    }
}

/// A diff hunk: header counters plus the body lines verbatim (including the
/// leading `+`/`-`/space/`\` markers). Immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub raw_lines: Vec<String>,
}

/// One changed file in a change set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    pub filename: String,
    pub status: FileStatus,
    pub hunks: Vec<DiffHunk>,
    pub additions: u32,
    pub deletions: u32,
}

/// Kind of a changed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    Addition,
    Deletion,
}

/// A merged, typed line interval (1-based, inclusive on both ends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedRange {
    pub start: u32,
    pub end: u32,
    pub kind: RangeKind,
}

/// Parses a unified diff text into a list of hunks.
///
/// Every line after a header and before the next header belongs to that
/// hunk's body, kept verbatim. Invalid headers are skipped without failing.
pub fn parse_unified_diff(patch: &str) -> Vec<DiffHunk> {
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut current: Option<DiffHunk> = None;

    for line in patch.lines() {
        if let Some(rest) = line.strip_prefix("@@") {
            if let Some(h) = current.take() {
                hunks.push(h);
            }
            match parse_hunk_header(rest) {
                Some(h) => current = Some(h),
                // skip invalid header; do not fail hard
                None => continue,
            }
        } else if let Some(hunk) = current.as_mut() {
            hunk.raw_lines.push(line.to_string());
        }
        // lines before the first header have no hunk to attach to
    }

    if let Some(h) = current {
        hunks.push(h);
    }

    hunks
}

/// Parse the remainder of a header line after `@@`, e.g. ` -1,5 +1,7 @@ fn x`.
fn parse_hunk_header(rest: &str) -> Option<DiffHunk> {
    let mut parts = rest.trim().split_whitespace();

    let old_part = parts.next()?.strip_prefix('-')?;
    let new_part = parts.next()?.strip_prefix('+')?;

    let (old_start, old_lines) = split_range(old_part)?;
    let (new_start, new_lines) = split_range(new_part)?;

    Some(DiffHunk {
        old_start,
        old_lines,
        new_start,
        new_lines,
        raw_lines: Vec::new(),
    })
}

/// Split `start[,len]` into counters; an omitted length defaults to 1.
fn split_range(s: &str) -> Option<(u32, u32)> {
    let mut it = s.split(',');
    let start: u32 = it.next()?.parse().ok()?;
    let len: u32 = match it.next() {
        Some(v) => v.parse().ok()?,
        None => 1,
    };
    Some((start, len))
}

/// Walk hunk bodies and emit one single-line range per added/removed line,
/// then merge near-adjacent ranges of the same kind.
pub fn hunks_to_changed_ranges(hunks: &[DiffHunk]) -> Vec<ChangedRange> {
    let mut ranges: Vec<ChangedRange> = Vec::new();

    for hunk in hunks {
        let mut old_line = hunk.old_start;
        let mut new_line = hunk.new_start;

        for line in &hunk.raw_lines {
            if line.starts_with('+') && !line.starts_with("+++") {
                ranges.push(ChangedRange {
                    start: new_line,
                    end: new_line,
                    kind: RangeKind::Addition,
                });
                new_line += 1;
            } else if line.starts_with('-') && !line.starts_with("---") {
                ranges.push(ChangedRange {
                    start: old_line,
                    end: old_line,
                    kind: RangeKind::Deletion,
                });
                old_line += 1;
            } else if !line.starts_with('\\') {
                // context line; "\ No newline at end of file" advances neither
                old_line += 1;
                new_line += 1;
            }
        }
    }

    merge_ranges(ranges)
}

/// Sort ranges by start and merge consecutive same-kind ranges whose gap is
/// within [`MERGE_FUZZ_LINES`]. Addition and deletion ranges never merge
/// with each other.
fn merge_ranges(ranges: Vec<ChangedRange>) -> Vec<ChangedRange> {
    if ranges.is_empty() {
        return Vec::new();
    }

    let mut sorted = ranges;
    sorted.sort_by_key(|r| r.start);

    let mut merged: Vec<ChangedRange> = Vec::new();
    let mut current = sorted[0];

    for next in sorted.into_iter().skip(1) {
        if next.kind == current.kind && next.start <= current.end + MERGE_FUZZ_LINES {
            current.end = current.end.max(next.end);
        } else {
            merged.push(current);
            current = next;
        }
    }
    merged.push(current);
    merged
}

/// Compute the merged changed ranges for one file.
///
/// Two statuses bypass hunk parsing entirely:
/// - `added`: one addition range spanning the whole new file, which requires
///   the fetched content to count lines;
/// - `removed`: nothing exists in the new tree to target, so no ranges.
pub fn changed_ranges(diff: &FileDiff, new_content: Option<&str>) -> EngineResult<Vec<ChangedRange>> {
    match diff.status {
        FileStatus::Added => {
            let content = new_content
                .ok_or_else(|| DiffError::MissingContent(diff.filename.clone()))?;
            let line_count = content.split('\n').count() as u32;
            Ok(vec![ChangedRange {
                start: 1,
                end: line_count,
                kind: RangeKind::Addition,
            }])
        }
        FileStatus::Removed => Ok(Vec::new()),
        FileStatus::Modified | FileStatus::Renamed => {
            let ranges = hunks_to_changed_ranges(&diff.hunks);
            debug!(
                file = %diff.filename,
                hunks = diff.hunks.len(),
                ranges = ranges.len(),
                "changed ranges computed"
            );
            Ok(ranges)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH: &str = "\
@@ -1,3 +1,4 @@
 fn one
-fn two
+fn TWO
+fn extra
 fn three
@@ -10 +11,2 @@
 tail
+more";

    fn file_diff(status: FileStatus, hunks: Vec<DiffHunk>) -> FileDiff {
        FileDiff {
            filename: "src/utils.ts".into(),
            status,
            hunks,
            additions: 0,
            deletions: 0,
        }
    }

    #[test]
    fn parses_headers_and_bodies() {
        let hunks = parse_unified_diff(PATCH);
        assert_eq!(hunks.len(), 2);

        assert_eq!(hunks[0].old_start, 1);
        assert_eq!(hunks[0].old_lines, 3);
        assert_eq!(hunks[0].new_start, 1);
        assert_eq!(hunks[0].new_lines, 4);
        assert_eq!(hunks[0].raw_lines.len(), 5);
        assert_eq!(hunks[0].raw_lines[1], "-fn two");

        // omitted length defaults to 1
        assert_eq!(hunks[1].old_lines, 1);
        assert_eq!(hunks[1].new_start, 11);
        assert_eq!(hunks[1].new_lines, 2);
    }

    #[test]
    fn prelude_and_malformed_headers_are_ignored() {
        let text = "diff --git a/x b/x\nindex 123..456\n@@ bogus @@\n@@ -3,2 +3,2 @@\n line\n-x\n+y";
        let hunks = parse_unified_diff(text);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].old_start, 3);
        assert_eq!(hunks[0].raw_lines, vec![" line", "-x", "+y"]);
    }

    #[test]
    fn replay_matches_hunk_counters() {
        // Reconstruct (old, new, marker) per body line and check that each
        // counter ends exactly start + declared length.
        for hunk in parse_unified_diff(PATCH) {
            let mut old_line = hunk.old_start;
            let mut new_line = hunk.new_start;
            for line in &hunk.raw_lines {
                if line.starts_with('+') && !line.starts_with("+++") {
                    new_line += 1;
                } else if line.starts_with('-') && !line.starts_with("---") {
                    old_line += 1;
                } else if !line.starts_with('\\') {
                    old_line += 1;
                    new_line += 1;
                }
            }
            assert_eq!(old_line, hunk.old_start + hunk.old_lines);
            assert_eq!(new_line, hunk.new_start + hunk.new_lines);
        }
    }

    #[test]
    fn ranges_use_new_coordinates_for_additions() {
        let hunks = parse_unified_diff(PATCH);
        let ranges = hunks_to_changed_ranges(&hunks);

        let additions: Vec<_> = ranges
            .iter()
            .filter(|r| r.kind == RangeKind::Addition)
            .collect();
        // +fn TWO lands on new line 2, +fn extra on 3 -> merged [2,3]; +more on 12
        assert_eq!(additions.len(), 2);
        assert_eq!((additions[0].start, additions[0].end), (2, 3));
        assert_eq!((additions[1].start, additions[1].end), (12, 12));

        let deletions: Vec<_> = ranges
            .iter()
            .filter(|r| r.kind == RangeKind::Deletion)
            .collect();
        assert_eq!(deletions.len(), 1);
        assert_eq!((deletions[0].start, deletions[0].end), (2, 2));
    }

    #[test]
    fn merge_respects_fuzz_distance() {
        let gap2 = merge_ranges(vec![
            ChangedRange { start: 5, end: 5, kind: RangeKind::Addition },
            ChangedRange { start: 7, end: 7, kind: RangeKind::Addition },
        ]);
        assert_eq!(gap2.len(), 1);
        assert_eq!((gap2[0].start, gap2[0].end), (5, 7));

        let gap3 = merge_ranges(vec![
            ChangedRange { start: 5, end: 5, kind: RangeKind::Addition },
            ChangedRange { start: 8, end: 8, kind: RangeKind::Addition },
        ]);
        assert_eq!(gap3.len(), 2);
    }

    #[test]
    fn merge_never_mixes_kinds() {
        let out = merge_ranges(vec![
            ChangedRange { start: 5, end: 5, kind: RangeKind::Addition },
            ChangedRange { start: 6, end: 6, kind: RangeKind::Deletion },
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn no_newline_marker_advances_nothing() {
        let text = "@@ -1,2 +1,2 @@\n line\n-old\n+new\n\\ No newline at end of file";
        let ranges = hunks_to_changed_ranges(&parse_unified_diff(text));
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].start, 2);
        assert_eq!(ranges[1].start, 2);
    }

    #[test]
    fn added_file_synthesizes_whole_file_range() {
        let content = (1..=12).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let diff = file_diff(FileStatus::Added, parse_unified_diff(PATCH));
        let ranges = changed_ranges(&diff, Some(&content)).unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(
            ranges[0],
            ChangedRange { start: 1, end: 12, kind: RangeKind::Addition }
        );
    }

    #[test]
    fn added_file_without_content_is_an_error() {
        let diff = file_diff(FileStatus::Added, Vec::new());
        assert!(changed_ranges(&diff, None).is_err());
    }

    #[test]
    fn removed_file_yields_no_ranges() {
        let diff = file_diff(FileStatus::Removed, parse_unified_diff(PATCH));
        let ranges = changed_ranges(&diff, Some("whatever")).unwrap();
        assert!(ranges.is_empty());
    }
}
