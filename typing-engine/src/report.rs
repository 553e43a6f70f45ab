//! Run report model: per-function outcomes and the per-file summary.
//!
//! Per-function failures are data, not errors; the loop collects them and the
//! CLI renders the final summary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Terminal state of the convergence loop for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    /// A pass made no further progress (or nothing was left to annotate).
    Converged,
    /// The try budget ran out with untyped functions remaining.
    Exhausted,
}

/// Why a model signature was rejected by the splicer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpliceSkipReason {
    /// No complete signature could be extracted from the completion.
    NoSignature,
    /// Unbalanced parentheses or a malformed `def` line.
    Implausible,
    /// The merged file no longer parsed; splice reverted.
    MergedParseFailed,
}

/// Outcome of one Isolator → Completer → Splicer attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionOutcome {
    /// New signature spliced in.
    Annotated,
    /// Completion reproduced the original signature byte-for-byte.
    Unchanged,
    /// Completer call failed (network, quota, timeout); function skipped.
    CompletionFailed(String),
    /// Model output unusable; original signature kept.
    SpliceSkipped(SpliceSkipReason),
    /// Context could not be shrunk under the token budget.
    TokenBudgetExceeded,
}

impl FunctionOutcome {
    /// Failures worth retrying on a later pass (transient by nature).
    pub fn is_transient_failure(&self) -> bool {
        matches!(self, FunctionOutcome::CompletionFailed(_))
    }
}

/// One attempt on one function during one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionAttempt {
    /// 1-based pass number.
    pub pass: usize,
    pub function: String,
    /// Source-order position of the function in the module. Names alone are
    /// ambiguous: Python allows redefining the same name at module level.
    pub index: usize,
    pub outcome: FunctionOutcome,
}

/// Summary of a whole convergence run over one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub state: LoopState,
    /// Annotating passes executed.
    pub passes: usize,
    pub typed_before: usize,
    pub typed_after: usize,
    pub total_functions: usize,
    /// Every attempt, in execution order.
    pub attempts: Vec<FunctionAttempt>,
    /// Functions still untyped at the end, with their last outcome.
    pub remaining: Vec<(String, FunctionOutcome)>,
    /// Where the result was (or would have been) written.
    pub output_path: Option<PathBuf>,
    /// True when `--pretend` suppressed the write.
    pub pretend: bool,
}

impl FileReport {
    /// Functions that gained a full signature during the run.
    pub fn newly_typed(&self) -> usize {
        self.typed_after.saturating_sub(self.typed_before)
    }
}
