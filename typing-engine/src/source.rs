//! Source model: one parse of a Python module into function records.
//!
//! Every pass of the convergence loop calls [`parse`] on the *current* file
//! text and works with the fresh records it returns. Nothing here mutates
//! state; splicing produces new text and the next pass reparses it. That
//! trades recomputation for the elimination of offset-drift bugs entirely.
//!
//! Scope per design: only module-level `def`s. Methods, nested functions and
//! lambdas are ignored.

use tree_sitter::{Node, Parser};

use crate::{
    error::ParseError,
    model::{
        function::{FunctionRecord, ParamRecord, Typedness},
        span::Span,
    },
};

/// Parse `text` and extract module-level function records, in source order.
///
/// # Errors
/// [`ParseError`] when the text is not syntactically valid Python (the tree
/// contains ERROR or MISSING nodes).
pub fn parse(text: &str) -> Result<Vec<FunctionRecord>, ParseError> {
    let tree = parse_tree(text)?;
    let root = tree.root_node();

    if root.has_error() {
        let (line, detail) = first_error(&root);
        return Err(ParseError { line, detail });
    }

    let mut out = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        let func = match child.kind() {
            "function_definition" => Some(child),
            // A decorated module-level def still counts; the decorators stay
            // outside the signature span.
            "decorated_definition" => child
                .child_by_field_name("definition")
                .filter(|d| d.kind() == "function_definition"),
            _ => None,
        };
        if let Some(node) = func {
            if let Some(record) = extract_function(&node, text) {
                out.push(record);
            }
        }
    }
    Ok(out)
}

/// 1-based line of the first top-level import statement, if any.
///
/// Used as the insertion point for the synthetic `from typing import *`.
pub fn first_import_line(text: &str) -> Option<usize> {
    let tree = parse_tree(text).ok()?;
    let root = tree.root_node();
    let mut cursor = root.walk();
    root.named_children(&mut cursor)
        .find(|n| {
            matches!(
                n.kind(),
                "import_statement" | "import_from_statement" | "future_import_statement"
            )
        })
        .map(|n| n.start_position().row + 1)
}

/// Whether the module already imports `typing` (plain or `from` form) at the
/// top level. When it does, no wildcard import is injected.
pub fn has_typing_import(text: &str) -> bool {
    let Ok(tree) = parse_tree(text) else {
        return false;
    };
    let root = tree.root_node();
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        let module = match node.kind() {
            "import_statement" => {
                let mut inner = node.walk();
                node.named_children(&mut inner).next().map(|n| match n.kind() {
                    "aliased_import" => n
                        .child_by_field_name("name")
                        .map(|m| node_text(&m, text))
                        .unwrap_or_default(),
                    _ => node_text(&n, text),
                })
            }
            "import_from_statement" => node
                .child_by_field_name("module_name")
                .map(|m| node_text(&m, text)),
            _ => None,
        };
        if let Some(module) = module {
            if module.split('.').next() == Some("typing") {
                return true;
            }
        }
    }
    false
}

/* ------------------------------------------------------------------------- */
/* Extraction                                                                */
/* ------------------------------------------------------------------------- */

fn extract_function(node: &Node, text: &str) -> Option<FunctionRecord> {
    let name = node_text(&node.child_by_field_name("name")?, text);
    let params_node = node.child_by_field_name("parameters")?;
    let body_node = node.child_by_field_name("body")?;
    let has_return_annotation = node.child_by_field_name("return_type").is_some();

    // The signature ends exactly at the `:` token that opens the body; any
    // trailing comment or blank line after it belongs to the body region.
    let colon = direct_colon(node)?;

    let signature_span = Span::new(
        node.start_position().row + 1,
        colon.end_position().row + 1,
        node.start_byte(),
        colon.end_byte(),
    );

    let params = extract_params(&params_node, text);
    let typedness = classify(&params, has_return_annotation, &body_node);

    Some(FunctionRecord {
        name,
        signature_span,
        body_span: Span::from_node(&body_node),
        params_span: Span::from_node(&params_node),
        params,
        has_return_annotation,
        typedness,
    })
}

/// The `:` that is a *direct* child of the definition (parameter annotations
/// carry their own, nested colons).
fn direct_colon<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == ":")
}

fn extract_params(params_node: &Node, text: &str) -> Vec<ParamRecord> {
    let mut out = Vec::new();
    let mut cursor = params_node.walk();
    for (idx, p) in params_node.named_children(&mut cursor).enumerate() {
        let record = match p.kind() {
            "identifier" => param_from_name(&p, text, false, None),
            "typed_parameter" => {
                // First named child is the pattern (identifier or splat).
                let mut inner = p.walk();
                let pattern = p.named_children(&mut inner).next();
                pattern.map(|pat| ParamRecord {
                    name: splat_name(&pat, text),
                    annotated: true,
                    default: None,
                    is_receiver: false,
                    is_splat: is_splat(&pat),
                    name_end_byte: pat.end_byte(),
                })
            }
            "default_parameter" => {
                let name_node = p.child_by_field_name("name");
                let default = p.child_by_field_name("value").map(|v| node_text(&v, text));
                name_node.map(|n| ParamRecord {
                    name: node_text(&n, text),
                    annotated: false,
                    default,
                    is_receiver: false,
                    is_splat: false,
                    name_end_byte: n.end_byte(),
                })
            }
            "typed_default_parameter" => {
                let name_node = p.child_by_field_name("name");
                let default = p.child_by_field_name("value").map(|v| node_text(&v, text));
                name_node.map(|n| ParamRecord {
                    name: node_text(&n, text),
                    annotated: true,
                    default,
                    is_receiver: false,
                    is_splat: false,
                    name_end_byte: n.end_byte(),
                })
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                Some(param_from_splat(&p, text))
            }
            // Bare `*` / `/` separators carry no name.
            _ => None,
        };
        if let Some(mut record) = record {
            record.is_receiver =
                idx == 0 && !record.is_splat && (record.name == "self" || record.name == "cls");
            out.push(record);
        }
    }
    out
}

fn param_from_name(node: &Node, text: &str, annotated: bool, default: Option<String>) -> Option<ParamRecord> {
    Some(ParamRecord {
        name: node_text(node, text),
        annotated,
        default,
        is_receiver: false,
        is_splat: false,
        name_end_byte: node.end_byte(),
    })
}

fn param_from_splat(node: &Node, text: &str) -> ParamRecord {
    ParamRecord {
        name: splat_name(node, text),
        annotated: false,
        default: None,
        is_receiver: false,
        is_splat: true,
        name_end_byte: node.end_byte(),
    }
}

fn is_splat(node: &Node) -> bool {
    matches!(
        node.kind(),
        "list_splat_pattern" | "dictionary_splat_pattern"
    )
}

fn splat_name(node: &Node, text: &str) -> String {
    node_text(node, text)
        .trim_start_matches('*')
        .trim()
        .to_string()
}

fn classify(params: &[ParamRecord], has_return_annotation: bool, body: &Node) -> Typedness {
    let missing_param = params
        .iter()
        .any(|p| !p.is_receiver && !p.is_splat && !p.annotated);
    if missing_param {
        return Typedness::NoArgs;
    }
    if !has_return_annotation && body_returns_value(body) {
        return Typedness::NoReturn;
    }
    Typedness::Fully
}

/// Whether the body contains a `return` or `yield` anywhere.
fn body_returns_value(body: &Node) -> bool {
    let mut stack = vec![*body];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "return_statement" | "yield") {
            return true;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    false
}

/* ------------------------------------------------------------------------- */
/* Parser plumbing                                                           */
/* ------------------------------------------------------------------------- */

fn parse_tree(text: &str) -> Result<tree_sitter::Tree, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ParseError {
            line: 0,
            detail: format!("python grammar unavailable: {e}"),
        })?;
    parser.parse(text, None).ok_or_else(|| ParseError {
        line: 0,
        detail: "parser produced no tree".to_string(),
    })
}

fn first_error(root: &Node) -> (usize, String) {
    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return (
                node.start_position().row + 1,
                format!("syntax error near `{}`", node.kind()),
            );
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    (0, "syntax error".to_string())
}

fn node_text(node: &Node, text: &str) -> String {
    text[node.byte_range()].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Fixture mirroring the upstream test corpus: one fully typed function,
    // one with a multi-line signature missing only the return type, one with
    // nothing annotated.
    const CORPUS: &str = "\nimport math\n\ndef mul(x: float, y: float) -> float:\n    return x + y\n\ndef sub(\n        x: int,\n        y: int\n    ):\n    return x + y\n\ndef add(x, y):\n    return x + y\n\nadd(3,4)\n";

    #[test]
    fn extracts_records_with_typedness() {
        let records = parse(CORPUS).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].name, "mul");
        assert_eq!(records[0].typedness, Typedness::Fully);
        assert_eq!(records[0].signature_span.start_line, 4);
        assert_eq!(records[0].signature_span.end_line, 4);

        assert_eq!(records[1].name, "sub");
        assert_eq!(records[1].typedness, Typedness::NoReturn);
        assert_eq!(records[1].signature_span.start_line, 7);
        assert_eq!(records[1].signature_span.end_line, 10);

        assert_eq!(records[2].name, "add");
        assert_eq!(records[2].typedness, Typedness::NoArgs);
    }

    #[test]
    fn signature_span_ends_at_colon() {
        let records = parse(CORPUS).unwrap();
        let sig = records[0].signature_text(CORPUS);
        assert_eq!(sig, "def mul(x: float, y: float) -> float:");
        let multi = records[1].signature_text(CORPUS);
        assert!(multi.starts_with("def sub("));
        assert!(multi.ends_with("):"));
    }

    #[test]
    fn receiver_is_skipped() {
        let src = "def f(self, x):\n    return x\n";
        let records = parse(src).unwrap();
        assert!(records[0].params[0].is_receiver);
        assert_eq!(
            records[0].first_unannotated_param().unwrap().name,
            "x"
        );
    }

    #[test]
    fn procedure_without_return_counts_as_typed() {
        let src = "def log(msg: str):\n    print(msg)\n";
        let records = parse(src).unwrap();
        assert_eq!(records[0].typedness, Typedness::Fully);
    }

    #[test]
    fn defaults_are_captured_verbatim() {
        let src = "def f(x=3, y='a b'):\n    return x\n";
        let records = parse(src).unwrap();
        assert_eq!(records[0].params[0].default.as_deref(), Some("3"));
        assert_eq!(records[0].params[1].default.as_deref(), Some("'a b'"));
    }

    #[test]
    fn nested_functions_are_ignored() {
        let src = "def outer():\n    def inner(x):\n        return x\n    return inner\n";
        let records = parse(src).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "outer");
    }

    #[test]
    fn invalid_source_is_a_parse_error() {
        let err = parse("def broken(:\n").unwrap_err();
        assert!(err.line >= 1);
    }

    #[test]
    fn import_helpers() {
        assert_eq!(first_import_line(CORPUS), Some(2));
        assert!(!has_typing_import(CORPUS));
        assert!(has_typing_import("from typing import *\n"));
        assert!(has_typing_import("import typing\n"));
        assert!(has_typing_import("import typing.io as t\n"));
        assert!(!has_typing_import("import mytyping\n"));
        assert_eq!(first_import_line("x = 1\n"), None);
    }
}
