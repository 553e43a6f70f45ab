//! Batch runner: files in, reports out.
//!
//! Files are independent, so they may be processed by a small worker pool;
//! everything inside one file stays strictly sequential because a splice
//! shifts the spans of every function after it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{info, warn};

use typing_engine::{
    Completer, EngineConfig, EngineError, FileReport, converge, output, scan,
};

/// Options for one batch run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub path: PathBuf,
    pub inplace: bool,
    pub format: String,
    pub pretend: bool,
    pub jobs: usize,
    pub engine: EngineConfig,
}

/// Aggregated result of a batch run.
#[derive(Debug)]
pub struct BatchSummary {
    /// Per-file reports, batch order.
    pub reports: Vec<FileReport>,
    /// Files that failed fatally (unreadable or unparseable), with reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    /// Success = every file was read and parsed; exhausted runs still count
    /// as success.
    pub fn exit_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run the typing pipeline over every Python file under `opts.path`.
///
/// # Errors
/// Only run-level conditions: a missing input path or invalid options.
/// Per-file problems land in [`BatchSummary::failures`].
pub async fn run(opts: RunOptions, completer: Arc<dyn Completer>) -> anyhow::Result<BatchSummary> {
    opts.engine.validate().context("invalid engine options")?;
    if !opts.inplace {
        // Fail early on a broken template instead of after the first file.
        output::format_output_path(&opts.path.join("probe.py"), &opts.format)
            .context("invalid --format template")?;
    }

    let files = scan::collect_python_files(&opts.path).context("collecting input files")?;
    if files.is_empty() {
        warn!("no python files under {}", opts.path.display());
    }

    let opts = Arc::new(opts);
    let semaphore = Arc::new(Semaphore::new(opts.jobs.max(1)));
    let mut set = JoinSet::new();

    for path in files {
        let opts = Arc::clone(&opts);
        let completer = Arc::clone(&completer);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            // Closed semaphore is impossible here; treat as skip.
            let Ok(_permit) = semaphore.acquire().await else {
                return Err((path, "worker pool shut down".to_string()));
            };
            process_file(path, &opts, completer.as_ref()).await
        });
    }

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(failure)) => failures.push(failure),
            Err(e) => failures.push((opts.path.clone(), format!("worker panicked: {e}"))),
        }
    }
    reports.sort_by(|a, b| a.path.cmp(&b.path));
    failures.sort();

    Ok(BatchSummary { reports, failures })
}

/// One file through the convergence loop, then to disk (unless pretending).
async fn process_file(
    path: PathBuf,
    opts: &RunOptions,
    completer: &dyn Completer,
) -> Result<FileReport, (PathBuf, String)> {
    let text = std::fs::read_to_string(&path)
        .map_err(|e| (path.clone(), format!("cannot read: {e}")))?;

    let (final_text, mut report) =
        converge::run_file(path.clone(), text, completer, &opts.engine)
            .await
            .map_err(|e: EngineError| (path.clone(), e.to_string()))?;

    let out_path = if opts.inplace {
        path.clone()
    } else {
        output::format_output_path(&path, &opts.format)
            .map_err(|e| (path.clone(), e.to_string()))?
    };

    report.pretend = opts.pretend;
    report.output_path = Some(out_path.clone());

    if opts.pretend {
        info!(path = %path.display(), "pretend: skipping write");
    } else {
        std::fs::write(&out_path, final_text)
            .map_err(|e| (out_path.clone(), format!("cannot write: {e}")))?;
        info!(path = %out_path.display(), "wrote result");
    }

    Ok(report)
}
