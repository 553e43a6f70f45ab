//! Completion client configuration, loaded strictly at startup.
//!
//! The API credential is resolved once here and injected into the client;
//! nothing deeper in the call stack reads ambient process state.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND`       = provider kind (`openai` [default] or `ollama`)
//! - `LLM_MAX_TOKENS` = optional per-call output-token ceiling (u32)
//! - `LLM_TIMEOUT_SECS` = optional request timeout (u32, default 60)
//!
//! OpenAI-specific:
//! - `OPENAI_KEY`   = API key; falls back to an `api.key` file in the working
//!   directory when unset
//! - `OPENAI_ORG`   = optional organization id
//! - `OPENAI_URL`   = endpoint base (default `https://api.openai.com`)
//! - `OPENAI_MODEL` = completion model (default `gpt-3.5-turbo-instruct`)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL`                = model name (mandatory)

use std::path::Path;

use crate::error::{ConfigError, Result, env_opt_u32, must_env};

/// Which completion backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// OpenAI legacy text-completions API.
    OpenAi,
    /// Local Ollama runtime.
    Ollama,
}

/// Configuration for a completion client.
#[derive(Debug, Clone)]
pub struct CompleterConfig {
    /// The provider/backend.
    pub provider: Provider,
    /// Model identifier string.
    pub model: String,
    /// Inference endpoint base URL.
    pub endpoint: String,
    /// API key for providers that require authentication.
    pub api_key: Option<String>,
    /// Optional organization id (OpenAI).
    pub organization: Option<String>,
    /// Per-call output-token ceiling override.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Stop sequences; completion halts at the first match.
    pub stop: Vec<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

impl CompleterConfig {
    /// Endpoint must use an http/https scheme.
    pub fn validate_endpoint(&self) -> Result<()> {
        let e = self.endpoint.trim();
        if e.is_empty() || !(e.starts_with("http://") || e.starts_with("https://")) {
            return Err(ConfigError::InvalidFormat {
                var: "endpoint",
                reason: "must start with http:// or https://",
            }
            .into());
        }
        Ok(())
    }
}

/// Build the config for the provider selected by `LLM_KIND` (default openai).
pub fn config_from_env() -> Result<CompleterConfig> {
    match std::env::var("LLM_KIND").ok().as_deref() {
        None | Some("openai") | Some("") => config_openai(),
        Some("ollama") => config_ollama(),
        Some(other) => Err(ConfigError::UnsupportedProvider(other.to_string()).into()),
    }
}

/// OpenAI config. The credential comes from `OPENAI_KEY`, falling back to an
/// `api.key` file in the working directory; missing both is fatal.
pub fn config_openai() -> Result<CompleterConfig> {
    let api_key = resolve_openai_key()?;
    let endpoint =
        std::env::var("OPENAI_URL").unwrap_or_else(|_| "https://api.openai.com".to_string());
    let model =
        std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo-instruct".to_string());

    Ok(CompleterConfig {
        provider: Provider::OpenAi,
        model,
        endpoint,
        api_key: Some(api_key),
        organization: std::env::var("OPENAI_ORG").ok().filter(|s| !s.is_empty()),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.5),
        stop: vec!["\n".to_string()],
        timeout_secs: timeout_from_env()?,
    })
}

/// Ollama config, endpoint resolved from `OLLAMA_URL` or `OLLAMA_PORT`.
pub fn config_ollama() -> Result<CompleterConfig> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("OLLAMA_MODEL")?;

    Ok(CompleterConfig {
        provider: Provider::Ollama,
        model,
        endpoint,
        api_key: None,
        organization: None,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(0.2),
        stop: vec!["\n".to_string()],
        timeout_secs: timeout_from_env()?,
    })
}

fn timeout_from_env() -> Result<Option<u64>> {
    Ok(env_opt_u32("LLM_TIMEOUT_SECS")?.map(u64::from).or(Some(60)))
}

fn resolve_openai_key() -> Result<String> {
    if let Ok(key) = std::env::var("OPENAI_KEY") {
        if !key.trim().is_empty() {
            return Ok(key.trim().to_string());
        }
    }
    if let Ok(contents) = std::fs::read_to_string(Path::new("api.key")) {
        let key = contents.trim();
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }
    Err(ConfigError::MissingVar("OPENAI_KEY (or api.key file)").into())
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String> {
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        if !url.trim().is_empty() {
            return Ok(url);
        }
    }
    if let Ok(port) = std::env::var("OLLAMA_PORT") {
        if !port.trim().is_empty() {
            let _ = port
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "OLLAMA_PORT",
                    reason: "expected u16 (1..=65535)",
                })?;
            return Ok(format!("http://localhost:{port}"));
        }
    }
    Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT").into())
}
