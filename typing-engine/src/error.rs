//! Unified error handling for `typing-engine`.
//!
//! This module exposes a single top-level error type [`EngineError`] for the
//! whole library, and groups domain-specific errors in nested types. Per the
//! pipeline design, only two conditions are fatal for a file: the input is not
//! valid Python, or it cannot be read. Everything that can go wrong for a
//! *single function* (completion failure, unusable model output, prompt over
//! budget) is a recoverable outcome carried in the run report, never an error
//! bubbled through `?`.

use std::path::PathBuf;

use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `typing-engine` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input text is not syntactically valid Python.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Filesystem failure on an input or output path.
    #[error("[typing-engine] io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration/validation errors.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/* ------------------------------------------------------------------------- */
/* Parse errors                                                              */
/* ------------------------------------------------------------------------- */

/// The source text could not be parsed as Python.
///
/// Fatal for the file it belongs to; other files in a batch continue.
#[derive(Debug, Error)]
#[error("[typing-engine] line {line}: not valid Python source ({detail})")]
pub struct ParseError {
    /// 1-based line of the first syntax error (0 when unknown).
    pub line: usize,
    /// Short human-readable detail.
    pub detail: String,
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for engine configuration validation.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric field was outside of the allowed range.
    #[error("[typing-engine] {field} is out of range: {detail}")]
    OutOfRange {
        /// Field name (e.g., `token_budget`).
        field: &'static str,
        /// Description of the expected range.
        detail: &'static str,
    },

    /// Output path template is unusable.
    #[error("[typing-engine] invalid output format template: {0}")]
    InvalidFormat(String),
}
