//! The completion boundary.
//!
//! The engine treats the completion service as an opaque, untrusted
//! collaborator: it hands over a rendered prompt and a token ceiling and gets
//! back literal continuation text. Nothing about the returned text is assumed
//! until the splicer has re-parsed the merged result.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single completion call. Per-function and recoverable: the
/// loop skips the function and keeps going.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Network/transport failure.
    #[error("completion transport error: {0}")]
    Transport(String),

    /// The call exceeded its timeout.
    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    /// Upstream returned a non-successful HTTP status.
    #[error("completion service returned HTTP {status}: {snippet}")]
    HttpStatus { status: u16, snippet: String },

    /// Response payload could not be decoded.
    #[error("completion response could not be decoded: {0}")]
    Decode(String),

    /// The service returned no usable choice.
    #[error("completion response was empty")]
    Empty,
}

/// Opaque text-completion capability.
///
/// `complete` returns the literal continuation of `prompt`, truncated by the
/// service at `max_tokens` output tokens. Implementations live outside the
/// engine; tests use scripted fakes.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, CompletionError>;
}
