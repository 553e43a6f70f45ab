//! Thin text-completion clients with env-driven config and unified errors.
//!
//! Two providers are supported: the OpenAI legacy completions API and a local
//! Ollama runtime. Both continue a raw prompt verbatim, which is what the
//! signature-annotation pipeline feeds them. [`CompletionClient`] dispatches
//! to whichever one the config selects; construct it once at startup and
//! share it.

pub mod config;
pub mod error;
pub mod ollama;
pub mod openai;

pub use config::{CompleterConfig, Provider, config_from_env};
pub use error::{ConfigError, LlmClientError, ProviderError, Result};

use crate::{ollama::OllamaCompletions, openai::OpenAiCompletions};

/// Provider-dispatching completion client.
#[derive(Debug)]
pub enum CompletionClient {
    OpenAi(OpenAiCompletions),
    Ollama(OllamaCompletions),
}

impl CompletionClient {
    /// Build the client for the provider the config names.
    ///
    /// # Errors
    /// Constructor validation errors of the underlying client.
    pub fn new(cfg: CompleterConfig) -> Result<Self> {
        match cfg.provider {
            Provider::OpenAi => Ok(Self::OpenAi(OpenAiCompletions::new(cfg)?)),
            Provider::Ollama => Ok(Self::Ollama(OllamaCompletions::new(cfg)?)),
        }
    }

    /// Continue `prompt`, generating at most `max_tokens` output tokens.
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        match self {
            Self::OpenAi(c) => c.complete(prompt, max_tokens).await,
            Self::Ollama(c) => c.complete(prompt, max_tokens).await,
        }
    }
}
