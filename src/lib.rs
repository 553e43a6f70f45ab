//! Batch front-end for the signature-typing pipeline.
//!
//! The interesting work lives in `typing-engine`; this crate wires the CLI,
//! the completion provider, the file worker pool, and the final report.

pub mod cli;
pub mod completer_adapter;
pub mod report;
pub mod run;
