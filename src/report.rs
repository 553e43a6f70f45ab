//! Colored terminal summary of a batch run.

use colored::Colorize;
use typing_engine::{FileReport, FunctionOutcome, LoopState};

use crate::run::BatchSummary;

/// Print the per-file and total summary to stdout.
pub fn print_summary(summary: &BatchSummary) {
    for report in &summary.reports {
        print_file(report);
    }

    for (path, reason) in &summary.failures {
        println!(
            "{} ~ {}: {}",
            "failed".red().bold(),
            path.display(),
            reason.red()
        );
    }

    let typed: usize = summary.reports.iter().map(|r| r.newly_typed()).sum();
    let untyped: usize = summary.reports.iter().map(|r| r.remaining.len()).sum();
    println!(
        "\n{} file(s), {} newly typed, {} still untyped, {} failed",
        summary.reports.len(),
        typed.to_string().green(),
        color_count(untyped),
        color_count(summary.failures.len()),
    );
}

fn print_file(report: &FileReport) {
    let state = match report.state {
        LoopState::Converged => "converged".green(),
        LoopState::Exhausted => "exhausted".red(),
    };
    println!(
        "{} ~ {}: {}/{} typed after {} pass(es)",
        state,
        report.path.display(),
        report.typed_after,
        report.total_functions,
        report.passes
    );

    for (name, outcome) in &report.remaining {
        println!("  {} {}: {}", "untyped".red(), name, describe(outcome));
    }

    if let Some(out) = &report.output_path {
        if report.pretend {
            println!("  {} would write {}", "pretend".dimmed(), out.display());
        } else {
            println!("  wrote {}", out.display());
        }
    }
}

fn describe(outcome: &FunctionOutcome) -> String {
    match outcome {
        FunctionOutcome::Annotated => "annotated".to_string(),
        FunctionOutcome::Unchanged => "no change suggested".to_string(),
        FunctionOutcome::CompletionFailed(reason) => format!("completion failed ({reason})"),
        FunctionOutcome::SpliceSkipped(reason) => format!("model output unusable ({reason:?})"),
        FunctionOutcome::TokenBudgetExceeded => "prompt over token budget".to_string(),
    }
}

fn color_count(n: usize) -> colored::ColoredString {
    if n == 0 {
        n.to_string().green()
    } else {
        n.to_string().red()
    }
}
