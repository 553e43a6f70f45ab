//! Adapts the `llm-completion` clients to the engine's `Completer` boundary.
//!
//! The engine only knows the opaque capability; this is where provider errors
//! are folded into the engine's per-function `CompletionError` taxonomy.

use std::time::Duration;

use async_trait::async_trait;
use llm_completion::{CompletionClient, LlmClientError, ProviderError};
use typing_engine::completer::{Completer, CompletionError};

/// Engine-facing wrapper around a provider client.
pub struct LlmCompleter {
    client: CompletionClient,
    timeout: Duration,
}

impl LlmCompleter {
    pub fn new(client: CompletionClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl Completer for LlmCompleter {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, CompletionError> {
        self.client
            .complete(prompt, max_tokens)
            .await
            .map_err(|e| map_error(e, self.timeout))
    }
}

fn map_error(err: LlmClientError, timeout: Duration) -> CompletionError {
    match err {
        LlmClientError::HttpTransport(e) if e.is_timeout() => CompletionError::Timeout(timeout),
        LlmClientError::HttpTransport(e) => CompletionError::Transport(e.to_string()),
        LlmClientError::Provider(ProviderError::HttpStatus {
            status, snippet, ..
        }) => CompletionError::HttpStatus {
            status: status.as_u16(),
            snippet,
        },
        LlmClientError::Provider(ProviderError::Decode(msg)) => CompletionError::Decode(msg),
        LlmClientError::Provider(ProviderError::EmptyChoices) => CompletionError::Empty,
        other => CompletionError::Transport(other.to_string()),
    }
}
