//! Function extraction from TypeScript/JavaScript source.
//!
//! Parses one file's full text with Tree-sitter and collects every
//! *addressable* function-like declaration: named function declarations,
//! equals-style default exports of function expressions, class/object
//! methods with identifier names, identifier-bound arrow functions and
//! function expressions, and object-literal properties holding functions.
//!
//! Anonymous function expressions with no enclosing identifier (inline
//! callbacks) are intentionally excluded: they have no stable address to
//! report as a target.

use serde::{Deserialize, Serialize};
use std::fmt;
use tree_sitter::{Language, Node, Parser};

use crate::errors::AstError;

/// Closed set of function shapes we address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FunctionKind {
    Function,
    Method,
    ArrowFunction,
    ClassMethod,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FunctionKind::Function => "function",
            FunctionKind::Method => "method",
            FunctionKind::ArrowFunction => "arrow-function",
            FunctionKind::ClassMethod => "class-method",
        };
        f.write_str(s)
    }
}

/// An addressable function-like declaration with its byte span.
///
/// Spans cover the full declaration (for arrow functions the whole
/// `name = () => {...}` declarator, not just the arrow body). Line numbers
/// are derived on demand via [`line_of_offset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub kind: FunctionKind,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl FunctionRecord {
    /// 1-based start line in `source`.
    pub fn start_line(&self, source: &str) -> u32 {
        line_of_offset(source, self.start_byte)
    }

    /// 1-based end line in `source`.
    pub fn end_line(&self, source: &str) -> u32 {
        line_of_offset(source, self.end_byte)
    }

    /// Verbatim source slice for the declaration.
    pub fn code<'a>(&self, source: &'a str) -> &'a str {
        let len = source.len();
        let s = self.start_byte.min(len);
        let e = self.end_byte.min(len).max(s);
        &source[s..e]
    }
}

/// 1-based line number of a byte offset, counting newlines in the prefix.
pub fn line_of_offset(source: &str, offset: usize) -> u32 {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() as u32 + 1
}

/// Pick a grammar for a source path by extension.
fn language_for(path: &str) -> Result<Language, AstError> {
    if path.ends_with(".tsx") {
        Ok(tree_sitter_typescript::LANGUAGE_TSX.into())
    } else if path.ends_with(".ts") {
        Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
    } else if path.ends_with(".js") || path.ends_with(".jsx") {
        Ok(tree_sitter_javascript::LANGUAGE.into())
    } else {
        Err(AstError::UnsupportedExtension(path.to_string()))
    }
}

fn is_function_expression(kind: &str) -> bool {
    // grammar versions differ on the node name
    matches!(kind, "function_expression" | "function")
}

/// Parse `source` and collect all addressable function records.
///
/// The tree walk uses an explicit work stack so deeply nested sources cannot
/// exhaust call-stack depth.
pub fn extract_functions(path: &str, source: &str) -> Result<Vec<FunctionRecord>, AstError> {
    let mut parser = Parser::new();
    let lang = language_for(path)?;
    parser.set_language(&lang).map_err(|_| AstError::Language)?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| AstError::Parse(path.to_string()))?;

    let mut out: Vec<FunctionRecord> = Vec::new();
    let mut stack: Vec<Node> = vec![tree.root_node()];

    while let Some(node) = stack.pop() {
        match node.kind() {
            // function foo() {}
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = identifier_field(&node, source, "name", "identifier") {
                    // exported declarations span the whole statement,
                    // `export` keyword included
                    let span = node
                        .parent()
                        .filter(|p| p.kind() == "export_statement")
                        .unwrap_or(node);
                    push_record(&mut out, name, FunctionKind::Function, &span);
                }
            }

            // export default function () {}  /  export = function () {}
            // A *named* exported function parses as a function_declaration and
            // is recorded by the arm above; only the expression form lands here.
            "export_statement" => {
                if let Some(value) = node.child_by_field_name("value") {
                    if is_function_expression(value.kind()) {
                        let name = identifier_field(&value, source, "name", "identifier")
                            .unwrap_or_else(|| "default".to_string());
                        push_record(&mut out, name, FunctionKind::Function, &node);
                    }
                }
            }

            // class methods (and object-literal shorthand methods)
            "method_definition" => {
                if let Some(name) = identifier_field(&node, source, "name", "property_identifier") {
                    push_record(&mut out, name, FunctionKind::ClassMethod, &node);
                }
            }

            // const run = () => {}  /  const f = function g() {}
            "variable_declarator" => {
                if let (Some(declared), Some(value)) = (
                    identifier_field(&node, source, "name", "identifier"),
                    node.child_by_field_name("value"),
                ) {
                    if value.kind() == "arrow_function" {
                        push_record(&mut out, declared, FunctionKind::ArrowFunction, &node);
                    } else if is_function_expression(value.kind()) {
                        // a named function expression supplies its own name
                        let name = identifier_field(&value, source, "name", "identifier")
                            .unwrap_or(declared);
                        push_record(&mut out, name, FunctionKind::Function, &node);
                    }
                }
            }

            // { handler: () => {} }  /  { handler: function () {} }
            "pair" => {
                if let (Some(key), Some(value)) = (
                    identifier_field(&node, source, "key", "property_identifier"),
                    node.child_by_field_name("value"),
                ) {
                    if value.kind() == "arrow_function" || is_function_expression(value.kind()) {
                        push_record(&mut out, key, FunctionKind::Method, &node);
                    }
                }
            }

            _ => {}
        }

        let mut w = node.walk();
        for ch in node.children(&mut w) {
            stack.push(ch);
        }
    }

    // The stack pops children in reverse document order; restore it.
    out.sort_by_key(|r| r.start_byte);
    Ok(out)
}

/// Text of a named field, but only when the field node has the expected
/// identifier kind (computed keys, string keys etc. yield `None`).
fn identifier_field(node: &Node, source: &str, field: &str, expected: &str) -> Option<String> {
    let n = node.child_by_field_name(field)?;
    if n.kind() != expected {
        return None;
    }
    source.get(n.byte_range()).map(|s| s.to_string())
}

fn push_record(out: &mut Vec<FunctionRecord>, name: String, kind: FunctionKind, node: &Node) {
    out.push(FunctionRecord {
        name,
        kind,
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(records: &[FunctionRecord]) -> Vec<(&str, FunctionKind)> {
        records.iter().map(|r| (r.name.as_str(), r.kind)).collect()
    }

    #[test]
    fn named_function_declaration() {
        let src = "export function computeTotal(items: number[]): number {\n  return 0;\n}\n";
        let recs = extract_functions("utils.ts", src).unwrap();
        assert_eq!(names(&recs), vec![("computeTotal", FunctionKind::Function)]);
        assert!(src[recs[0].start_byte..].starts_with("export function"));
    }

    #[test]
    fn default_exported_function_expression_is_named_default() {
        let src = "export default function () {\n  return 1;\n};\n";
        let recs = extract_functions("mod.ts", src).unwrap();
        assert_eq!(names(&recs), vec![("default", FunctionKind::Function)]);
    }

    #[test]
    fn class_method_with_identifier_name() {
        let src = "class Cart {\n  total() { return 0; }\n}\n";
        let recs = extract_functions("cart.ts", src).unwrap();
        assert_eq!(names(&recs), vec![("total", FunctionKind::ClassMethod)]);
    }

    #[test]
    fn arrow_function_bound_to_identifier() {
        let src = "const run = () => {\n  return 42;\n};\n";
        let recs = extract_functions("run.ts", src).unwrap();
        assert_eq!(names(&recs), vec![("run", FunctionKind::ArrowFunction)]);
        // span covers the declarator, starting at `run`
        assert!(src[recs[0].start_byte..].starts_with("run ="));
    }

    #[test]
    fn function_expression_bound_to_identifier() {
        let src = "const f = function () { return 1; };\nconst g = function inner() { return 2; };\n";
        let recs = extract_functions("fx.ts", src).unwrap();
        assert_eq!(
            names(&recs),
            vec![("f", FunctionKind::Function), ("inner", FunctionKind::Function)]
        );
    }

    #[test]
    fn object_property_function_is_a_method() {
        let src = "const api = {\n  handler: (req) => req,\n  legacy: function (x) { return x; },\n};\n";
        let recs = extract_functions("api.ts", src).unwrap();
        // the declarator itself holds an object, not a function
        assert_eq!(
            names(&recs),
            vec![("handler", FunctionKind::Method), ("legacy", FunctionKind::Method)]
        );
    }

    #[test]
    fn anonymous_inline_callback_is_never_recorded() {
        let src = "items.forEach(function (item) { use(item); });\nitems.map((x) => x + 1);\n";
        let recs = extract_functions("cb.ts", src).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn jsx_sources_use_the_javascript_grammar() {
        let src = "const View = () => <div>hi</div>;\n";
        let recs = extract_functions("view.jsx", src).unwrap();
        assert_eq!(names(&recs), vec![("View", FunctionKind::ArrowFunction)]);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        assert!(matches!(
            extract_functions("main.py", "def x(): pass"),
            Err(AstError::UnsupportedExtension(_))
        ));
    }

    #[test]
    fn lines_are_derived_from_offsets() {
        let src = "a\nb\nfunction f() {\n  return 1;\n}\n";
        let recs = extract_functions("l.ts", src).unwrap();
        assert_eq!(recs[0].start_line(src), 3);
        assert_eq!(recs[0].end_line(src), 5);
        assert_eq!(line_of_offset(src, 0), 1);
        assert_eq!(line_of_offset(src, src.len()), 6);
    }
}
