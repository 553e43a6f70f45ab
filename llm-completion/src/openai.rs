//! OpenAI text-completion client.
//!
//! Minimal, synchronous (non-streaming) client around the legacy completions
//! endpoint, which continues a raw prompt verbatim — exactly the shape the
//! signature-annotation prompts need:
//! - POST {endpoint}/v1/completions
//!
//! Constructor validation:
//! - `cfg.provider` must be `Provider::OpenAi`
//! - `cfg.api_key` must be present
//! - `cfg.endpoint` must start with http:// or https://
//!
//! Errors are normalized via the unified types in `error`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::{CompleterConfig, Provider},
    error::{ConfigError, LlmClientError, ProviderError, make_snippet},
};

/// Thin client for the OpenAI completions API.
///
/// Constructed from a complete [`CompleterConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (with timeout and default headers).
#[derive(Debug)]
pub struct OpenAiCompletions {
    client: reqwest::Client,
    cfg: CompleterConfig,
    url: String,
}

impl OpenAiCompletions {
    /// Creates a new client from the given config.
    ///
    /// # Errors
    /// - [`ConfigError::ProviderMismatch`] if `cfg.provider` is not OpenAI
    /// - [`ConfigError::MissingVar`] if `cfg.api_key` is `None`
    /// - [`ConfigError::InvalidFormat`] if the endpoint scheme is invalid
    /// - [`LlmClientError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: CompleterConfig) -> Result<Self, LlmClientError> {
        if cfg.provider != Provider::OpenAi {
            return Err(ConfigError::ProviderMismatch.into());
        }

        let api_key = cfg
            .api_key
            .clone()
            .ok_or(ConfigError::MissingVar("OPENAI_KEY"))?;

        cfg.validate_endpoint()?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                ProviderError::Decode(format!("invalid API key header: {e}"))
            })?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(org) = &cfg.organization {
            headers.insert(
                "OpenAI-Organization",
                header::HeaderValue::from_str(org).map_err(|e| {
                    ProviderError::Decode(format!("invalid organization header: {e}"))
                })?,
            );
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let base = cfg.endpoint.trim().trim_end_matches('/').to_string();
        let url = format!("{}/v1/completions", base);

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = cfg.timeout_secs.unwrap_or(60),
            "OpenAiCompletions initialized"
        );

        Ok(Self { client, cfg, url })
    }

    /// Performs a **non-streaming** completion request.
    ///
    /// # Errors
    /// - [`ProviderError::HttpStatus`] for non-2xx responses
    /// - [`LlmClientError::HttpTransport`] for client/network failures
    /// - [`ProviderError::Decode`] if the JSON cannot be parsed
    /// - [`ProviderError::EmptyChoices`] if no choices are returned
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmClientError> {
        let started = Instant::now();
        let body = CompletionRequest::from_cfg(&self.cfg, prompt, max_tokens);

        debug!(
            model = %self.cfg.model,
            prompt_len = prompt.len(),
            max_tokens,
            "POST {}", self.url
        );

        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "OpenAI /v1/completions returned non-success status"
            );

            return Err(ProviderError::HttpStatus {
                status,
                url,
                snippet,
            }
            .into());
        }

        let out: CompletionResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                error!(
                    error = %e,
                    model = %self.cfg.model,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode /v1/completions response"
                );
                return Err(ProviderError::Decode(format!(
                    "serde error: {e}; expected `choices[0].text`"
                ))
                .into());
            }
        };

        let text = out
            .choices
            .into_iter()
            .find_map(|c| c.text)
            .ok_or(ProviderError::EmptyChoices)?;

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            completion_len = text.len(),
            "completion finished"
        );

        Ok(text)
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

/// Minimal request body for `/v1/completions` (non-streaming).
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    best_of: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<&'a str>,
}

impl<'a> CompletionRequest<'a> {
    fn from_cfg(cfg: &'a CompleterConfig, prompt: &'a str, max_tokens: u32) -> Self {
        Self {
            model: &cfg.model,
            prompt,
            max_tokens: cfg.max_tokens.unwrap_or(max_tokens),
            best_of: 1,
            stream: false,
            temperature: cfg.temperature,
            stop: cfg.stop.iter().map(String::as_str).collect(),
        }
    }
}

/// Minimal response body for `/v1/completions`.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CompleterConfig {
        CompleterConfig {
            provider: Provider::OpenAi,
            model: "gpt-3.5-turbo-instruct".into(),
            endpoint: "https://api.openai.com".into(),
            api_key: Some("sk-test".into()),
            organization: None,
            max_tokens: None,
            temperature: Some(0.5),
            stop: vec!["\n".into()],
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn request_body_shape() {
        let c = cfg();
        let body = CompletionRequest::from_cfg(&c, "def f(x:", 64);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo-instruct");
        assert_eq!(json["prompt"], "def f(x:");
        assert_eq!(json["max_tokens"], 64);
        assert_eq!(json["best_of"], 1);
        assert_eq!(json["stream"], false);
        assert_eq!(json["stop"][0], "\n");
    }

    #[test]
    fn config_max_tokens_overrides_call_site() {
        let mut c = cfg();
        c.max_tokens = Some(48);
        let body = CompletionRequest::from_cfg(&c, "p", 64);
        assert_eq!(body.max_tokens, 48);
    }

    #[test]
    fn wrong_provider_is_rejected() {
        let mut c = cfg();
        c.provider = Provider::Ollama;
        assert!(OpenAiCompletions::new(c).is_err());
    }

    #[test]
    fn missing_key_is_rejected() {
        let mut c = cfg();
        c.api_key = None;
        assert!(OpenAiCompletions::new(c).is_err());
    }
}
