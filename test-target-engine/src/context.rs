//! Surrounding-code excerpt for a matched function.
//!
//! The excerpt starts at the nearest preceding function in the same file
//! (the one with the greatest end line still before the matched function's
//! start), or 10 lines above when no function precedes, and runs through
//! 5 lines past the matched function's end. This hands the prompt builder
//! nearby imports, helpers and types without shipping the entire file.

use crate::ast::FunctionRecord;

const LINES_ABOVE_WITHOUT_NEIGHBOR: u32 = 10;
const LINES_BELOW: u32 = 5;

/// Build the context excerpt for `func` within `source`.
pub fn extract_context(source: &str, func: &FunctionRecord, all: &[FunctionRecord]) -> String {
    let func_start = func.start_line(source);
    let func_end = func.end_line(source);

    // Nearest preceding neighbor: greatest end line strictly above us.
    let previous = all
        .iter()
        .filter(|f| f.end_line(source) < func_start)
        .max_by_key(|f| f.end_line(source));

    let context_start = match previous {
        Some(prev) => prev.start_line(source),
        None => func_start.saturating_sub(LINES_ABOVE_WITHOUT_NEIGHBOR).max(1),
    };

    let lines: Vec<&str> = source.split('\n').collect();
    let start_idx = (context_start as usize).saturating_sub(1).min(lines.len());
    let end_idx = ((func_end + LINES_BELOW) as usize).min(lines.len());

    lines[start_idx..end_idx].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::extract_functions;

    const SRC: &str = "\
import { x } from 'x';

function helper() {
  return x;
}

function target() {
  return helper();
}

const tail1 = 1;
const tail2 = 2;
";

    #[test]
    fn excerpt_starts_at_preceding_function() {
        let functions = extract_functions("ctx.ts", SRC).unwrap();
        let target = functions.iter().find(|f| f.name == "target").unwrap();

        let ctx = extract_context(SRC, target, &functions);
        // begins on the helper's start line, ends 5 lines past target's end
        assert!(ctx.starts_with("function helper()"));
        assert!(ctx.contains("const tail2 = 2;"));
        assert!(!ctx.contains("import { x }"));
    }

    #[test]
    fn excerpt_without_neighbor_backs_up_ten_lines_clamped() {
        let functions = extract_functions("ctx.ts", SRC).unwrap();
        let helper = functions.iter().find(|f| f.name == "helper").unwrap();

        // helper starts at line 3; 3 - 10 clamps to line 1
        let ctx = extract_context(SRC, helper, &functions);
        assert!(ctx.starts_with("import { x }"));
    }

    #[test]
    fn excerpt_end_is_clamped_to_file_length() {
        let src = "function only() {\n  return 1;\n}";
        let functions = extract_functions("one.ts", src).unwrap();
        let ctx = extract_context(src, &functions[0], &functions);
        assert_eq!(ctx, src);
    }
}
