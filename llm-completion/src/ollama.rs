//! Lightweight Ollama completion client.
//!
//! Thin client for the local Ollama API:
//! - `POST {endpoint}/api/generate` — synchronous text generation
//!   (`stream=false`, `raw=true` so the prompt is continued verbatim without
//!   a chat template)
//!
//! Uses the universal [`CompleterConfig`] and ensures the selected provider
//! is [`Provider::Ollama`].

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::{CompleterConfig, Provider},
    error::{ConfigError, LlmClientError, ProviderError, make_snippet},
};

/// Thin client for the Ollama generate API.
#[derive(Debug)]
pub struct OllamaCompletions {
    client: reqwest::Client,
    cfg: CompleterConfig,
    url: String,
}

impl OllamaCompletions {
    /// Creates a new client from the given config.
    ///
    /// # Errors
    /// - [`ConfigError::ProviderMismatch`] if `cfg.provider` is not Ollama
    /// - [`ConfigError::InvalidFormat`] if the endpoint scheme is invalid
    /// - [`LlmClientError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: CompleterConfig) -> Result<Self, LlmClientError> {
        if cfg.provider != Provider::Ollama {
            return Err(ConfigError::ProviderMismatch.into());
        }
        cfg.validate_endpoint()?;

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let base = cfg.endpoint.trim().trim_end_matches('/').to_string();
        let url = format!("{}/api/generate", base);

        info!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            "OllamaCompletions initialized"
        );

        Ok(Self { client, cfg, url })
    }

    /// Performs a **non-streaming** raw generation request.
    ///
    /// # Errors
    /// - [`ProviderError::HttpStatus`] for non-2xx responses
    /// - [`LlmClientError::HttpTransport`] for client/network failures
    /// - [`ProviderError::Decode`] if the JSON cannot be parsed
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmClientError> {
        let started = Instant::now();
        let body = GenerateRequest::from_cfg(&self.cfg, prompt, max_tokens);

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
                "Ollama /api/generate returned non-success status"
            );

            return Err(ProviderError::HttpStatus {
                status,
                url,
                snippet,
            }
            .into());
        }

        let out: GenerateResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                error!(
                    error = %e,
                    model = %self.cfg.model,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode /api/generate response"
                );
                return Err(ProviderError::Decode(format!(
                    "serde error: {e}; expected `response`"
                ))
                .into());
            }
        };

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            completion_len = out.response.len(),
            "generation finished"
        );

        Ok(out.response)
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

/// Request body for `/api/generate` (non-streaming, raw continuation).
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    raw: bool,
    options: GenerateOptions<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<&'a str>,
}

impl<'a> GenerateRequest<'a> {
    fn from_cfg(cfg: &'a CompleterConfig, prompt: &'a str, max_tokens: u32) -> Self {
        Self {
            model: &cfg.model,
            prompt,
            stream: false,
            raw: true,
            options: GenerateOptions {
                num_predict: cfg.max_tokens.unwrap_or(max_tokens),
                temperature: cfg.temperature,
                stop: cfg.stop.iter().map(String::as_str).collect(),
            },
        }
    }
}

/// Response body for `/api/generate`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let cfg = CompleterConfig {
            provider: Provider::Ollama,
            model: "codellama".into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            organization: None,
            max_tokens: None,
            temperature: Some(0.2),
            stop: vec!["\n".into()],
            timeout_secs: Some(5),
        };
        let body = GenerateRequest::from_cfg(&cfg, "def f(x:", 64);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "codellama");
        assert_eq!(json["stream"], false);
        assert_eq!(json["raw"], true);
        assert_eq!(json["options"]["num_predict"], 64);
        assert_eq!(json["options"]["stop"][0], "\n");
    }
}
