//! Convergence loop: repeated full-file passes until a fixed point.
//!
//! State machine: Scanning → Annotating → Converged | Exhausted. Each pass
//! reparses the current text from scratch; within a pass, functions are
//! processed strictly in source order and the text is reparsed again before
//! every function, because a splice shifts the spans of everything after it.
//! Spans are never patched by offset arithmetic.
//!
//! Functions inside one file are sequential by design; parallelism, if any,
//! belongs to the *file* level in the caller.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::{
    completer::Completer,
    config::EngineConfig,
    error::Result,
    isolate,
    report::{FileReport, FunctionAttempt, FunctionOutcome, LoopState},
    source, splice,
};

/// Run the full convergence loop over one file's text.
///
/// Returns the final text (unwritten; the caller decides where it goes) and
/// the per-file report. `path` is used for the report and logs only.
///
/// # Errors
/// Only a fatal condition for this file: the *initial* text does not parse.
/// Per-function failures are recorded in the report and never abort the run.
pub async fn run_file(
    path: PathBuf,
    text: String,
    completer: &dyn Completer,
    cfg: &EngineConfig,
) -> Result<(String, FileReport)> {
    let initial = source::parse(&text)?;
    let total_functions = initial.len();
    let typed_before = initial.iter().filter(|r| r.is_typed()).count();

    let mut current = text;
    let mut attempts: Vec<FunctionAttempt> = Vec::new();
    let mut passes = 0usize;
    let mut tries: i64 = 0;

    let state = loop {
        // Scanning: fresh records from the latest text.
        let records = source::parse(&current)?;
        let untyped = records.iter().filter(|r| !r.is_typed()).count();
        if untyped == 0 {
            info!(path = %path.display(), passes, "all functions typed");
            break LoopState::Converged;
        }

        // Annotating: one pass over every untyped function, source order.
        passes += 1;
        let mut any_changed = false;
        let mut any_transient_failure = false;

        for idx in 0..records.len() {
            // Reparse before each function: earlier splices in this pass
            // moved every later span.
            let records = source::parse(&current)?;
            let Some(target) = records.get(idx) else {
                warn!(path = %path.display(), idx, "function disappeared mid-pass");
                break;
            };
            if target.is_typed() {
                continue;
            }
            let name = target.name.clone();

            let outcome = annotate_one(&mut current, &records, idx, completer, cfg).await;
            debug!(
                path = %path.display(),
                function = %name,
                pass = passes,
                ?outcome,
                "function attempt finished"
            );
            any_changed |= outcome == FunctionOutcome::Annotated;
            any_transient_failure |= outcome.is_transient_failure();
            attempts.push(FunctionAttempt {
                pass: passes,
                function: name,
                index: idx,
                outcome,
            });
        }

        // Fixed point: nothing changed and nothing failed transiently.
        // Transient completion failures keep the loop retrying until the
        // try budget runs out.
        if !any_changed && !any_transient_failure {
            info!(path = %path.display(), passes, "no further progress, converged");
            break LoopState::Converged;
        }

        tries += 1;
        if !cfg.unlimited_tries() && tries >= cfg.max_tries {
            warn!(path = %path.display(), tries, "try budget exhausted");
            break LoopState::Exhausted;
        }
    };

    let final_records = source::parse(&current)?;
    let typed_after = final_records.iter().filter(|r| r.is_typed()).count();
    let remaining = final_records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_typed())
        .map(|(idx, r)| {
            // Match by position, not name: the module may redefine a name.
            let last = attempts
                .iter()
                .rev()
                .find(|a| a.index == idx)
                .map(|a| a.outcome.clone())
                .unwrap_or(FunctionOutcome::Unchanged);
            (r.name.clone(), last)
        })
        .collect();

    let report = FileReport {
        path,
        state,
        passes,
        typed_before,
        typed_after,
        total_functions,
        attempts,
        remaining,
        output_path: None,
        pretend: false,
    };
    Ok((current, report))
}

/// One Isolator → Completer → Splicer attempt. On success, `current` is
/// replaced by the spliced text.
async fn annotate_one(
    current: &mut String,
    records: &[crate::model::function::FunctionRecord],
    idx: usize,
    completer: &dyn Completer,
    cfg: &EngineConfig,
) -> FunctionOutcome {
    let doc = match isolate::isolate(current, records, idx, cfg.token_budget) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(function = %records[idx].name, %err, "prompt over budget, skipping");
            return FunctionOutcome::TokenBudgetExceeded;
        }
    };

    let prompt = doc.render();
    let completion = match completer.complete(&prompt, cfg.max_output_tokens).await {
        Ok(text) => text,
        Err(err) => {
            warn!(function = %records[idx].name, %err, "completion failed, skipping");
            return FunctionOutcome::CompletionFailed(err.to_string());
        }
    };

    let result = splice::splice(current, &records[idx], &doc.anchor, &completion);
    if result.changed {
        *current = result.text;
    }
    result.outcome
}
