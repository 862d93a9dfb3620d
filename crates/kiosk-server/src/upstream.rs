//! Upstream completion API client.
//!
//! One outbound call: POST `/v1/completions` with the legacy completions
//! wire format. The text of the first choice is relayed back to the caller.
//! No retries, no backoff, no streaming.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use kiosk_core::{CompletionBackend, Error, Result};

/// Configuration for the upstream completion API.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the API (without the `/v1/completions` suffix).
    pub base_url: String,
    /// Bearer credential, usually from `OPENAI_API_KEY`.
    pub api_key: String,
    /// Model requested from the upstream.
    pub model: String,
    /// Completion length cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Client-side request timeout.
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            model: "gpt-3.5-turbo-instruct".to_string(),
            max_tokens: 150,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Completion request wire format.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    /// Model to use.
    pub model: &'a str,
    /// The prompt to complete.
    pub prompt: &'a str,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Number of completions.
    pub n: u32,
    /// Stop sequences (serialized as `null` when absent).
    pub stop: Option<Vec<String>>,
    /// Temperature for sampling.
    pub temperature: f32,
}

/// Completion response wire format.
///
/// Only the fields this service consumes are modeled; the upstream sends
/// more.
#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    /// Generated choices.
    pub choices: Vec<CompletionChoice>,
}

/// A single completion choice.
#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    /// Generated text.
    pub text: String,
}

/// HTTP client for the completion API.
pub struct CompletionClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl CompletionClient {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("kiosk/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl CompletionBackend for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = CompletionRequest {
            model: &self.config.model,
            prompt,
            max_tokens: self.config.max_tokens,
            n: 1,
            stop: None,
            temperature: self.config.temperature,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::upstream(None, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::upstream(
                Some(status.as_u16()),
                format!("upstream returned {status}: {detail}"),
            ));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            Error::upstream(Some(status.as_u16()), format!("invalid response body: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text.trim().to_string())
            .ok_or_else(|| Error::upstream(Some(status.as_u16()), "response contained no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> CompletionClient {
        CompletionClient::new(UpstreamConfig {
            base_url: server.base_url(),
            api_key: "test-key".to_string(),
            ..UpstreamConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_request_wire_format() {
        let request = CompletionRequest {
            model: "gpt-3.5-turbo-instruct",
            prompt: "What is Rust?",
            max_tokens: 150,
            n: 1,
            stop: None,
            temperature: 0.7,
        };

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert_eq!(json["prompt"], "What is Rust?");
        assert_eq!(json["max_tokens"], 150);
        assert!(json["stop"].is_null());
    }

    #[tokio::test]
    async fn test_complete_relays_first_choice() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/completions")
                    .header("authorization", "Bearer test-key");
                then.status(200)
                    .json_body(serde_json::json!({
                        "choices": [{"text": "  Rust is a systems language.  "}]
                    }));
            })
            .await;

        let client = client_for(&server);
        let answer = client.complete("What is Rust?").await.unwrap();

        mock.assert_async().await;
        assert_eq!(answer, "Rust is a systems language.");
    }

    #[tokio::test]
    async fn test_complete_maps_upstream_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/completions");
                then.status(500).body("upstream exploded");
            })
            .await;

        let client = client_for(&server);
        let err = client.complete("anything").await.unwrap_err();

        match err {
            Error::Upstream { status, .. } => assert_eq!(status, Some(500)),
            other => panic!("expected Upstream, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_complete_rejects_empty_choices() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/completions");
                then.status(200)
                    .json_body(serde_json::json!({"choices": []}));
            })
            .await;

        let client = client_for(&server);
        let err = client.complete("anything").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));
    }
}
