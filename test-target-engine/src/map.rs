//! Map changed ranges onto extracted functions and build test targets.
//!
//! Only addition ranges participate in overlap matching: a line deleted from
//! the old file has no corresponding line in the new file's function to
//! attribute the change to.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{FunctionKind, FunctionRecord};
use crate::context::extract_context;
use crate::diff::{ChangedRange, RangeKind};

/// One changed function packaged for downstream test generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestTarget {
    pub file_path: String,
    pub function_name: String,
    pub function_type: FunctionKind,
    /// 1-based inclusive line span of the declaration.
    pub start_line: u32,
    pub end_line: u32,
    /// Verbatim source slice for the function.
    pub code: String,
    /// Surrounding-code excerpt for prompting.
    pub context: String,
    pub existing_test_file: Option<String>,
    /// Changed ranges whose line interval falls inside `[start_line, end_line]`.
    pub changed_ranges: Vec<ChangedRange>,
}

/// Three-way interval test: a function is touched when an addition range
/// starts inside it, ends inside it, or fully contains it.
pub fn function_overlaps_changes(
    func: &FunctionRecord,
    ranges: &[ChangedRange],
    source: &str,
) -> bool {
    let start = func.start_line(source);
    let end = func.end_line(source);

    ranges
        .iter()
        .filter(|r| r.kind == RangeKind::Addition)
        .any(|r| {
            (r.start >= start && r.start <= end)
                || (r.end >= start && r.end <= end)
                || (r.start <= start && r.end >= end)
        })
}

/// Build targets for one file from its functions and merged changed ranges.
///
/// `existing_test_file` is shared by all targets of the file (the locator
/// probes once per file, not per function). Discovery order follows the
/// functions' document order.
pub fn build_targets(
    file_path: &str,
    source: &str,
    functions: &[FunctionRecord],
    ranges: &[ChangedRange],
    existing_test_file: Option<&str>,
) -> Vec<TestTarget> {
    let mut targets = Vec::new();

    for func in functions {
        if !function_overlaps_changes(func, ranges, source) {
            continue;
        }
        let start_line = func.start_line(source);
        let end_line = func.end_line(source);

        targets.push(TestTarget {
            file_path: file_path.to_string(),
            function_name: func.name.clone(),
            function_type: func.kind,
            start_line,
            end_line,
            code: func.code(source).to_string(),
            context: extract_context(source, func, functions),
            existing_test_file: existing_test_file.map(|s| s.to_string()),
            changed_ranges: ranges
                .iter()
                .copied()
                .filter(|r| r.start >= start_line && r.end <= end_line)
                .collect(),
        });

        debug!(
            file = file_path,
            function = %func.name,
            kind = %func.kind,
            "found test target"
        );
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::extract_functions;
    use proptest::prelude::*;

    fn addition(start: u32, end: u32) -> ChangedRange {
        ChangedRange { start, end, kind: RangeKind::Addition }
    }

    fn record(start_byte: usize, end_byte: usize) -> FunctionRecord {
        FunctionRecord {
            name: "f".into(),
            kind: FunctionKind::Function,
            start_byte,
            end_byte,
        }
    }

    // 30 lines of one character each: byte 2*(n-1) starts line n.
    fn thirty_lines() -> String {
        (0..30).map(|_| "x\n").collect()
    }

    #[test]
    fn overlap_covers_all_three_cases() {
        let src = thirty_lines();
        // function spanning lines 10..=20
        let func = record(18, 39);
        assert_eq!(func.start_line(&src), 10);
        assert_eq!(func.end_line(&src), 20);

        // range start falls inside
        assert!(function_overlaps_changes(&func, &[addition(19, 25)], &src));
        // range end falls inside
        assert!(function_overlaps_changes(&func, &[addition(5, 12)], &src));
        // range fully contains the function
        assert!(function_overlaps_changes(&func, &[addition(1, 30)], &src));
        // disjoint
        assert!(!function_overlaps_changes(&func, &[addition(21, 25)], &src));
        assert!(!function_overlaps_changes(&func, &[addition(1, 9)], &src));
    }

    #[test]
    fn deletions_never_match() {
        let src = thirty_lines();
        let func = record(18, 39);
        let del = ChangedRange { start: 12, end: 15, kind: RangeKind::Deletion };
        assert!(!function_overlaps_changes(&func, &[del], &src));
    }

    proptest! {
        /// The three-way test is exactly interval intersection.
        #[test]
        fn overlap_equals_interval_intersection(
            f_start in 1u32..200,
            f_len in 0u32..40,
            r_start in 1u32..200,
            r_len in 0u32..40,
        ) {
            let f_end = f_start + f_len;
            let r_end = r_start + r_len;
            let three_way = (r_start >= f_start && r_start <= f_end)
                || (r_end >= f_start && r_end <= f_end)
                || (r_start <= f_start && r_end >= f_end);
            let intersects = r_start.max(f_start) <= r_end.min(f_end);
            prop_assert_eq!(three_way, intersects);
        }
    }

    #[test]
    fn targets_clip_ranges_to_the_function_span() {
        let src = "\
function first() {
  return 1;
}

function second() {
  return 2;
}
";
        let functions = extract_functions("two.ts", src).unwrap();
        assert_eq!(functions.len(), 2);

        // one range inside `second` (lines 5..=7), one outside any function
        let ranges = vec![addition(6, 6), addition(20, 22)];
        let targets = build_targets("two.ts", src, &functions, &ranges, Some("two.test.ts"));

        assert_eq!(targets.len(), 1);
        let t = &targets[0];
        assert_eq!(t.function_name, "second");
        assert_eq!(t.changed_ranges, vec![addition(6, 6)]);
        assert_eq!(t.existing_test_file.as_deref(), Some("two.test.ts"));
        assert!(t.code.starts_with("function second"));
    }
}
