//! Core pipeline for annotating Python function signatures with type hints.
//!
//! The pipeline isolates each untyped function into a bounded prompt, asks an
//! opaque [`completer::Completer`] for the annotated signature, splices the
//! result back while preserving every other byte of the file, and repeats
//! full-file passes until the file stops changing or the try budget runs out.
//!
//! Crate layout:
//! - [`source`]   — parse Python into fresh [`model::function::FunctionRecord`]s each pass
//! - [`isolate`]  — build the reordered, budget-trimmed prompt document
//! - [`splice`]   — merge the untrusted completion back into the file
//! - [`converge`] — the Scanning → Annotating → Converged|Exhausted loop
//! - [`scan`]     — input file discovery
//! - [`output`]   — `{filename}`/`{ext}` output naming
//! - [`report`]   — per-function outcomes and per-file summaries

pub mod completer;
pub mod config;
pub mod converge;
pub mod error;
pub mod isolate;
pub mod model;
pub mod output;
pub mod report;
pub mod scan;
pub mod source;
pub mod splice;

pub use completer::{Completer, CompletionError};
pub use config::EngineConfig;
pub use converge::run_file;
pub use error::{EngineError, ParseError, Result};
pub use report::{FileReport, FunctionOutcome, LoopState};
