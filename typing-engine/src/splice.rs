//! Splicer: merge a model-produced signature back into the original file.
//!
//! Only the original signature span is ever replaced; every byte before and
//! after it (body, comments, blank lines, default values) is copied verbatim.
//! The completion text is untrusted: a signature is first extracted from it,
//! sanity-checked, and the merged file is re-parsed before the splice is
//! accepted. Any failure keeps the original text and reports a skip.

use tracing::debug;

use crate::{
    isolate::TYPING_IMPORT,
    model::function::FunctionRecord,
    report::{FunctionOutcome, SpliceSkipReason},
    source,
};

/// Result of one splice attempt. `text` is the (possibly unchanged) full file.
#[derive(Debug, Clone)]
pub struct SpliceResult {
    pub text: String,
    /// Raw-text inequality of old vs new signature. No whitespace
    /// normalization: trivial reformatting must not fake convergence.
    pub changed: bool,
    pub outcome: FunctionOutcome,
}

/// Splice `completion` (the continuation of `anchor`) over `target`'s
/// signature span in `full_text`.
pub fn splice(
    full_text: &str,
    target: &FunctionRecord,
    anchor: &str,
    completion: &str,
) -> SpliceResult {
    let keep = |outcome| SpliceResult {
        text: full_text.to_string(),
        changed: false,
        outcome,
    };

    // 1. Extract just the signature; the model often echoes the body back.
    let candidate = format!("{anchor}{completion}");
    let Some(new_signature) = extract_signature(&candidate) else {
        debug!(function = %target.name, "splice: no complete signature in completion");
        return keep(FunctionOutcome::SpliceSkipped(SpliceSkipReason::NoSignature));
    };

    // 2. Cheap plausibility before touching the file.
    if !plausible_signature(&new_signature) {
        debug!(function = %target.name, "splice: implausible signature rejected");
        return keep(FunctionOutcome::SpliceSkipped(SpliceSkipReason::Implausible));
    }

    let original_signature = target.signature_text(full_text);
    if new_signature == original_signature {
        return keep(FunctionOutcome::Unchanged);
    }

    // 3. Replace exactly the signature span.
    let span = target.signature_span;
    let mut new_text = String::with_capacity(full_text.len() + new_signature.len());
    new_text.push_str(&full_text[..span.start_byte]);
    new_text.push_str(&new_signature);
    new_text.push_str(&full_text[span.end_byte..]);

    // 4. The merged result must still be valid Python.
    if source::parse(&new_text).is_err() {
        debug!(function = %target.name, "splice: merged text no longer parses, reverting");
        return keep(FunctionOutcome::SpliceSkipped(
            SpliceSkipReason::MergedParseFailed,
        ));
    }

    // 5. Make sure the wildcard typing import exists, once, at the top.
    let new_text = ensure_typing_import(&new_text);

    SpliceResult {
        text: new_text,
        changed: true,
        outcome: FunctionOutcome::Annotated,
    }
}

/// Take the prefix of `candidate` through the first `:` at bracket depth
/// zero. Everything after it (duplicated body, chatter) is discarded.
/// Quoted string literals (default values may contain brackets or colons)
/// are opaque to the scan.
fn extract_signature(candidate: &str) -> Option<String> {
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, ch) in candidate.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            ':' if depth == 0 => {
                return Some(candidate[..=idx].to_string());
            }
            _ => {}
        }
    }
    None
}

/// Balanced parens, `def ` prefix, `:` suffix. String literals are skipped
/// the same way as in [`extract_signature`].
fn plausible_signature(sig: &str) -> bool {
    if !sig.starts_with("def ") || !sig.ends_with(':') {
        return false;
    }
    let mut depth: i32 = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in sig.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && quote.is_none() && sig.contains('(')
}

/// Insert `from typing import *` once, before the first import statement or
/// at the very top. A file that already imports `typing` is left alone, so
/// the operation is idempotent across passes.
fn ensure_typing_import(text: &str) -> String {
    if source::has_typing_import(text) {
        return text.to_string();
    }
    let import_line = format!("{TYPING_IMPORT}\n");
    let insert_at_line = source::first_import_line(text);
    let mut lines: Vec<&str> = text.split_inclusive('\n').collect();
    let pos = insert_at_line
        .map(|l| l.saturating_sub(1).min(lines.len()))
        .unwrap_or(0);
    lines.insert(pos, &import_line);
    lines.concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::parse;

    const SRC: &str = "def add(x, y):\n    # keep me\n    return x + y\n\nadd(1, 2)\n";

    fn target() -> FunctionRecord {
        parse(SRC).unwrap().remove(0)
    }

    #[test]
    fn annotates_and_preserves_everything_else() {
        let result = splice(SRC, &target(), "def add(x:", " int, y: int) -> int:");
        assert!(result.changed);
        assert_eq!(result.outcome, FunctionOutcome::Annotated);
        assert!(result.text.contains("def add(x: int, y: int) -> int:"));
        assert!(result.text.contains("    # keep me\n    return x + y\n"));
        assert!(result.text.contains("add(1, 2)\n"));
        assert!(result.text.starts_with("from typing import *\n"));
    }

    #[test]
    fn echoed_body_is_discarded() {
        let completion = " int, y: int) -> int:\n    return x + y\n\nprint('noise')";
        let result = splice(SRC, &target(), "def add(x:", completion);
        assert!(result.changed);
        // Exactly one body.
        assert_eq!(result.text.matches("return x + y").count(), 1);
    }

    #[test]
    fn identical_signature_is_no_change() {
        // Completion reproduces the current signature exactly: idempotence.
        let src = "def add(x: int, y: int) -> int:\n    return x + y\n";
        let target = parse(src).unwrap().remove(0);
        let result = splice(src, &target, "def add(x:", " int, y: int) -> int:");
        assert!(!result.changed);
        assert_eq!(result.outcome, FunctionOutcome::Unchanged);
        assert_eq!(result.text, src);
    }

    #[test]
    fn garbage_completion_is_skipped_not_fatal() {
        let result = splice(SRC, &target(), "def add(x:", " int, y: int) -> ");
        assert!(!result.changed);
        assert_eq!(
            result.outcome,
            FunctionOutcome::SpliceSkipped(SpliceSkipReason::NoSignature)
        );
        assert_eq!(result.text, SRC);
    }

    #[test]
    fn unbalanced_signature_is_skipped() {
        let result = splice(SRC, &target(), "def add(x:", " int, y: int)) -> int:");
        assert_eq!(result.text, SRC);
        assert!(matches!(
            result.outcome,
            FunctionOutcome::SpliceSkipped(_)
        ));
    }

    #[test]
    fn merged_text_must_reparse() {
        // Balanced but nonsense once merged.
        let result = splice(SRC, &target(), "def add(x:", " int, y int) -> int:");
        assert!(!result.changed);
        assert_eq!(
            result.outcome,
            FunctionOutcome::SpliceSkipped(SpliceSkipReason::MergedParseFailed)
        );
    }

    #[test]
    fn quoted_default_with_bracket_chars_splices() {
        let src = "def f(x=\")\"):\n    return x\n";
        let target = parse(src).unwrap().remove(0);
        let result = splice(src, &target, "def f(x:", " str = \")\") -> str:");
        assert!(result.changed);
        assert_eq!(result.outcome, FunctionOutcome::Annotated);
        assert!(result.text.contains("def f(x: str = \")\") -> str:"));
    }

    #[test]
    fn bracket_inside_quoted_default_does_not_unbalance_scan() {
        let sig = extract_signature("def f(x: str = \")\") -> str:\n    pass");
        assert_eq!(sig.as_deref(), Some("def f(x: str = \")\") -> str:"));
        assert!(plausible_signature(sig.as_deref().unwrap()));
    }

    #[test]
    fn subscripted_return_type_extracts_fully() {
        let sig = extract_signature("def f(x: int) -> Dict[str, int]:\n    pass");
        assert_eq!(sig.as_deref(), Some("def f(x: int) -> Dict[str, int]:"));
    }

    #[test]
    fn typing_import_not_duplicated() {
        let src = "from typing import *\n\ndef add(x, y):\n    return x + y\n";
        let target = parse(src).unwrap().remove(0);
        let result = splice(src, &target, "def add(x:", " int, y: int) -> int:");
        assert!(result.changed);
        assert_eq!(result.text.matches("from typing import *").count(), 1);
    }

    #[test]
    fn typing_import_lands_before_first_import() {
        let src = "import os\n\ndef add(x, y):\n    return x + y\n";
        let target = parse(src).unwrap().remove(0);
        let result = splice(src, &target, "def add(x:", " int, y: int) -> int:");
        assert!(result.text.starts_with("from typing import *\nimport os\n"));
    }
}
