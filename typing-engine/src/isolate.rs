//! Isolator: build a bounded prompt document for one target function.
//!
//! The completion API is single-shot with no fill-in-the-middle mode, so the
//! file is reordered: everything that is *not* the target signature becomes
//! context, a synthetic `from typing import *` is injected, and the document
//! ends with a partial signature anchor exactly where generation should
//! begin. The target's own text is never shortened; when the budget is tight
//! only the surrounding context shrinks.

use thiserror::Error;
use tracing::debug;

use crate::model::function::{FunctionRecord, Typedness};

/// The wildcard import injected into every prompt (and, on change, into the
/// spliced file).
pub const TYPING_IMPORT: &str = "from typing import *";

/// Per-function isolation failure: the context could not be shrunk enough.
#[derive(Debug, Error)]
#[error("prompt exceeds token budget even after shortening ({tokens} > {budget})")]
pub struct TokenBudgetExceeded {
    pub tokens: usize,
    pub budget: usize,
}

/// Reordered document: preamble context, then the partial signature anchor as
/// the very last text, ending where the completion begins.
#[derive(Debug, Clone)]
pub struct PromptDocument {
    /// Code before the target, typing import injected, possibly shortened.
    pub preamble: String,
    /// Everything after the target signature: its body plus trailing code.
    pub context: String,
    /// Original signature as a comment, when the anchor truncates it.
    pub reminder: Option<String>,
    /// Partial `def …` line the model continues from.
    pub anchor: String,
}

impl PromptDocument {
    /// Render to the literal prompt string. The anchor is last and is not
    /// newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.preamble.len() + self.context.len() + self.anchor.len() + 64,
        );
        out.push_str(&self.preamble);
        if !out.ends_with('\n') && !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.context);
        if !out.ends_with('\n') && !out.is_empty() {
            out.push('\n');
        }
        out.push('\n');
        if let Some(reminder) = &self.reminder {
            out.push_str(reminder);
            out.push('\n');
        }
        out.push_str(&self.anchor);
        out
    }

    /// Rough token estimate: one token per four bytes.
    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.render())
    }
}

/// Rough token estimate for plain text.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Build the prompt document for `records[target_idx]` within `full_text`,
/// shrinking surrounding context until it fits `token_budget`.
///
/// Shortening stages, re-measured after each:
/// 1. strip comment-only and docstring lines from the preamble;
/// 2. additionally stub other function bodies in the preamble with `...`.
///
/// # Errors
/// [`TokenBudgetExceeded`] when even the fully shortened document is over
/// budget. The target function itself is never truncated.
pub fn isolate(
    full_text: &str,
    records: &[FunctionRecord],
    target_idx: usize,
    token_budget: usize,
) -> Result<PromptDocument, TokenBudgetExceeded> {
    let target = &records[target_idx];
    let sig = target.signature_span;

    let before = &full_text[..sig.start_byte.min(full_text.len())];
    let after = &full_text[sig.end_byte.min(full_text.len())..];

    let anchor = build_anchor(full_text, target);
    let reminder = build_reminder(full_text, target);

    let mut doc = PromptDocument {
        preamble: inject_typing_import(before),
        context: after.to_string(),
        reminder,
        anchor,
    };

    let mut tokens = doc.estimated_tokens();
    if tokens <= token_budget {
        return Ok(doc);
    }

    // Stage 1: drop comments and docstring lines from the preamble.
    doc.preamble = inject_typing_import(&strip_comment_lines(before));
    tokens = doc.estimated_tokens();
    debug!(tokens, token_budget, "isolate: stripped preamble comments");
    if tokens <= token_budget {
        return Ok(doc);
    }

    // Stage 2: stub other function bodies that lie in the preamble.
    let stubbed = stub_function_bodies(before, records, target_idx);
    doc.preamble = inject_typing_import(&strip_comment_lines(&stubbed));
    tokens = doc.estimated_tokens();
    debug!(tokens, token_budget, "isolate: stubbed preamble bodies");
    if tokens <= token_budget {
        return Ok(doc);
    }

    Err(TokenBudgetExceeded {
        tokens,
        budget: token_budget,
    })
}

/* ------------------------------------------------------------------------- */
/* Anchor construction                                                       */
/* ------------------------------------------------------------------------- */

/// Partial signature the model continues from.
///
/// - `NoArgs`: cut right after the name of the first parameter that still
///   needs an annotation; earlier parameters stay verbatim.
/// - `NoReturn`: full parameter list verbatim, ending in `->`.
fn build_anchor(full_text: &str, target: &FunctionRecord) -> String {
    match target.typedness {
        Typedness::NoArgs => {
            let cut = target
                .first_unannotated_param()
                .map(|p| p.name_end_byte)
                .unwrap_or(target.params_span.end_byte.saturating_sub(1));
            let open = target.params_span.start_byte + 1; // past '('
            let head = &full_text[open.min(cut)..cut];
            format!("def {}({}:", target.name, head)
        }
        _ => {
            let params = target.params_span.slice_text(full_text);
            format!("def {}{} ->", target.name, params)
        }
    }
}

/// For `NoArgs` the anchor cuts the signature off before any defaults; keep
/// them visible to the model via a one-line comment with the original text.
fn build_reminder(full_text: &str, target: &FunctionRecord) -> Option<String> {
    if target.typedness != Typedness::NoArgs {
        return None;
    }
    let has_default = target.params.iter().any(|p| p.default.is_some());
    if !has_default {
        return None;
    }
    let flat = target
        .signature_text(full_text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Some(format!("# original signature: {flat}"))
}

/* ------------------------------------------------------------------------- */
/* Preamble shortening                                                       */
/* ------------------------------------------------------------------------- */

/// Insert the wildcard typing import before the first import line of the
/// preamble, or at the very top when there is none.
fn inject_typing_import(preamble: &str) -> String {
    let mut lines: Vec<&str> = preamble.split_inclusive('\n').collect();
    let import_line = format!("{TYPING_IMPORT}\n");
    let pos = lines
        .iter()
        .position(|l| {
            let t = l.trim_start();
            t.starts_with("import ") || t.starts_with("from ")
        })
        .unwrap_or(0);
    lines.insert(pos, &import_line);
    lines.concat()
}

/// Remove comment-only lines and (heuristically) docstring blocks, the same
/// way the completion prompt was historically shortened.
fn strip_comment_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_docstring = false;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''") {
            // Single-line docstring toggles twice.
            let tail = &trimmed[3..];
            if !(tail.ends_with("\"\"\"") || tail.ends_with("'''")) || tail.len() < 3 {
                in_docstring = !in_docstring;
            }
            continue;
        }
        if in_docstring || trimmed.starts_with('#') || trimmed.is_empty() {
            continue;
        }
        out.push_str(line);
    }
    out
}

/// Replace the bodies of non-target functions fully contained in `before`
/// with an ellipsis stub, keeping their signatures intact.
fn stub_function_bodies(
    before: &str,
    records: &[FunctionRecord],
    target_idx: usize,
) -> String {
    let mut result = before.to_string();
    // Back to front so earlier byte offsets stay valid.
    for (idx, record) in records.iter().enumerate().rev() {
        if idx == target_idx {
            continue;
        }
        let body = record.body_span;
        if body.end_byte > before.len() || body.byte_len() == 0 {
            continue;
        }
        // Keep the newline structure stable when the body already ends in one.
        let stub = if result.as_bytes().get(body.end_byte - 1) == Some(&b'\n') {
            "    ...\n"
        } else {
            "    ..."
        };
        result.replace_range(body.start_byte..body.end_byte, stub);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse;

    const SRC: &str = "import os\n\n# helper\ndef helper(a: int) -> int:\n    # doubles\n    return a * 2\n\ndef add(x, y):\n    return x + y\n";

    #[test]
    fn anchor_is_last_and_partial() {
        let records = parse(SRC).unwrap();
        let doc = isolate(SRC, &records, 1, 10_000).unwrap();
        let rendered = doc.render();
        assert!(rendered.ends_with("def add(x:"));
        // Target body appears before the anchor, unharmed.
        assert!(rendered.contains("return x + y"));
    }

    #[test]
    fn typing_import_precedes_first_import() {
        let records = parse(SRC).unwrap();
        let doc = isolate(SRC, &records, 1, 10_000).unwrap();
        let rendered = doc.render();
        let typing_at = rendered.find(TYPING_IMPORT).unwrap();
        let os_at = rendered.find("import os").unwrap();
        assert!(typing_at < os_at);
    }

    #[test]
    fn no_return_anchor_keeps_params_and_defaults() {
        let src = "def scale(x: int, factor: float = 1.5):\n    return x * factor\n";
        let records = parse(src).unwrap();
        let doc = isolate(src, &records, 0, 10_000).unwrap();
        assert_eq!(
            doc.anchor,
            "def scale(x: int, factor: float = 1.5) ->"
        );
    }

    #[test]
    fn no_args_anchor_with_defaults_gets_reminder() {
        let src = "def f(x=3, y=4):\n    return x + y\n";
        let records = parse(src).unwrap();
        let doc = isolate(src, &records, 0, 10_000).unwrap();
        assert_eq!(doc.anchor, "def f(x:");
        let reminder = doc.reminder.unwrap();
        assert!(reminder.contains("def f(x=3, y=4):"));
    }

    #[test]
    fn typed_prefix_kept_in_anchor() {
        let src = "def g(a: int, b, c):\n    return b\n";
        let records = parse(src).unwrap();
        let doc = isolate(src, &records, 0, 10_000).unwrap();
        assert_eq!(doc.anchor, "def g(a: int, b:");
    }

    #[test]
    fn budget_strips_comments_first() {
        let records = parse(SRC).unwrap();
        let full = isolate(SRC, &records, 1, 10_000).unwrap();
        let tight_budget = full.estimated_tokens() - 1;
        let doc = isolate(SRC, &records, 1, tight_budget).unwrap();
        assert!(!doc.preamble.contains("# helper"));
        // Target untouched.
        assert!(doc.anchor.ends_with("def add(x:") || doc.anchor == "def add(x:");
    }

    #[test]
    fn stubbing_keeps_signatures_and_drops_bodies() {
        let records = parse(SRC).unwrap();
        let before = &SRC[..records[1].signature_span.start_byte];
        let stubbed = stub_function_bodies(before, &records, 1);
        assert!(stubbed.contains("def helper(a: int) -> int:"));
        assert!(stubbed.contains("    ...\n"));
        assert!(!stubbed.contains("return a * 2"));
    }

    #[test]
    fn impossible_budget_is_reported() {
        let records = parse(SRC).unwrap();
        let err = isolate(SRC, &records, 1, 1).unwrap_err();
        assert!(err.tokens > err.budget);
    }
}
