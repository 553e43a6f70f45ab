//! End-to-end convergence loop tests with a scripted completer.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use typing_engine::{
    completer::{Completer, CompletionError},
    config::EngineConfig,
    converge::run_file,
    report::{FunctionOutcome, LoopState},
};

/// Completer that picks a canned continuation by the anchor the prompt ends
/// with, and records every prompt it saw.
struct Scripted {
    rules: Vec<(&'static str, Result<&'static str, ()>)>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(rules: Vec<(&'static str, Result<&'static str, ()>)>) -> Self {
        Self {
            rules,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Completer for Scripted {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        for (suffix, reply) in &self.rules {
            if prompt.ends_with(suffix) {
                return match reply {
                    Ok(text) => Ok((*text).to_string()),
                    Err(()) => Err(CompletionError::Transport("scripted outage".into())),
                };
            }
        }
        Err(CompletionError::Empty)
    }
}

fn cfg() -> EngineConfig {
    EngineConfig::default()
}

#[tokio::test]
async fn scenario_fully_annotated_on_first_call() {
    let src = "def add(x, y):\n    return x + y\n";
    let completer = Scripted::new(vec![("def add(x:", Ok(" int, y: int) -> int:"))]);

    let (text, report) = run_file(PathBuf::from("a.py"), src.to_string(), &completer, &cfg())
        .await
        .unwrap();

    assert_eq!(report.state, LoopState::Converged);
    assert_eq!(report.passes, 1);
    assert_eq!(report.typed_before, 0);
    assert_eq!(report.typed_after, 1);
    assert!(text.contains("def add(x: int, y: int) -> int:"));
    assert!(text.starts_with("from typing import *\n"));
    assert!(text.contains("    return x + y\n"));
}

#[tokio::test]
async fn bytes_outside_signatures_are_preserved() {
    let src = "# header comment\n\ndef add(x, y):\n    # body comment\n\n    return x + y\n\n# trailing\n";
    let completer = Scripted::new(vec![("def add(x:", Ok(" int, y: int) -> int:"))]);

    let (text, _) = run_file(PathBuf::from("a.py"), src.to_string(), &completer, &cfg())
        .await
        .unwrap();

    assert!(text.contains("# header comment\n"));
    assert!(text.contains("    # body comment\n\n    return x + y\n"));
    assert!(text.ends_with("# trailing\n"));
}

#[tokio::test]
async fn one_failure_one_success_exhausts_try_budget() {
    let src = "def alpha(a):\n    return a\n\ndef beta(b):\n    return b\n";
    let completer = Scripted::new(vec![
        ("def alpha(a:", Err(())),
        ("def beta(b:", Ok(" str) -> str:")),
    ]);

    let (text, report) = run_file(PathBuf::from("a.py"), src.to_string(), &completer, &cfg())
        .await
        .unwrap();

    assert_eq!(report.state, LoopState::Exhausted);
    assert_eq!(report.passes, 3);
    assert_eq!(report.typed_after, 1);
    assert!(text.contains("def beta(b: str) -> str:"));
    assert!(text.contains("def alpha(a):"));

    assert_eq!(report.remaining.len(), 1);
    assert_eq!(report.remaining[0].0, "alpha");
    assert!(matches!(
        report.remaining[0].1,
        FunctionOutcome::CompletionFailed(_)
    ));
    let failures = report
        .attempts
        .iter()
        .filter(|a| matches!(a.outcome, FunctionOutcome::CompletionFailed(_)))
        .count();
    assert_eq!(failures, 3);
}

#[tokio::test]
async fn redefined_function_names_report_their_own_outcomes() {
    // Python allows redefining a name at module level; outcomes must attach
    // to the right definition, not just the name.
    let src = "def dup(a):\n    return a\n\ndef dup(b):\n    return b * 2\n";
    let completer = Scripted::new(vec![
        ("def dup(a:", Err(())),
        ("def dup(b:", Ok(" nonsense without a colon")),
    ]);

    let (_, report) = run_file(PathBuf::from("a.py"), src.to_string(), &completer, &cfg())
        .await
        .unwrap();

    assert_eq!(report.state, LoopState::Exhausted);
    assert_eq!(report.remaining.len(), 2);
    assert_eq!(report.remaining[0].0, "dup");
    assert_eq!(report.remaining[1].0, "dup");
    assert!(matches!(
        report.remaining[0].1,
        FunctionOutcome::CompletionFailed(_)
    ));
    assert!(matches!(
        report.remaining[1].1,
        FunctionOutcome::SpliceSkipped(_)
    ));
}

#[tokio::test]
async fn unusable_output_converges_without_looping_forever() {
    let src = "def add(x, y):\n    return x + y\n";
    // Never a valid signature: deterministic no-progress.
    let completer = Scripted::new(vec![("def add(x:", Ok(" garbage without colon"))]);

    let (text, report) = run_file(PathBuf::from("a.py"), src.to_string(), &completer, &cfg())
        .await
        .unwrap();

    assert_eq!(report.state, LoopState::Converged);
    assert_eq!(report.passes, 1);
    assert_eq!(text, src);
    assert!(matches!(
        report.remaining[0].1,
        FunctionOutcome::SpliceSkipped(_)
    ));
}

#[tokio::test]
async fn sequential_splices_do_not_corrupt_later_functions() {
    let src = "def one(a):\n    return a\n\ndef two(b):\n    return b\n\ndef three(c):\n    return c\n";
    let completer = Scripted::new(vec![
        ("def one(a:", Ok(" int) -> int:")),
        ("def two(b:", Ok(" List[str]) -> List[str]:")),
        ("def three(c:", Ok(" Optional[float]) -> Optional[float]:")),
    ]);

    let (text, report) = run_file(PathBuf::from("a.py"), src.to_string(), &completer, &cfg())
        .await
        .unwrap();

    assert_eq!(report.state, LoopState::Converged);
    assert_eq!(report.typed_after, 3);
    assert!(text.contains("def one(a: int) -> int:\n    return a\n"));
    assert!(text.contains("def two(b: List[str]) -> List[str]:\n    return b\n"));
    assert!(text.contains("def three(c: Optional[float]) -> Optional[float]:\n    return c\n"));
    assert_eq!(text.matches("from typing import *").count(), 1);
}

#[tokio::test]
async fn multiline_signature_gets_return_annotation() {
    let src = "def sub(\n        x: int,\n        y: int\n    ):\n    return x + y\n";
    let completer = Scripted::new(vec![(") ->", Ok(" int:"))]);

    let (text, report) = run_file(PathBuf::from("a.py"), src.to_string(), &completer, &cfg())
        .await
        .unwrap();

    assert_eq!(report.state, LoopState::Converged);
    assert_eq!(report.typed_after, 1);
    assert!(text.contains("    ) -> int:\n    return x + y\n"));
}

#[tokio::test]
async fn unparseable_input_is_fatal_for_the_file() {
    let completer = Scripted::new(vec![]);
    let err = run_file(
        PathBuf::from("bad.py"),
        "def broken(:\n".to_string(),
        &completer,
        &cfg(),
    )
    .await;
    assert!(err.is_err());
}
