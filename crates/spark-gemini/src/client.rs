// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini `generateContent` endpoint.
//!
//! Provides [`GeminiClient`] which handles authentication, request
//! construction, and opt-in retry of transient errors.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use spark_config::model::GeminiConfig;
use spark_core::SparkError;
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, GenerateContentRequest, GenerateContentResponse};

/// HTTP client for Gemini API communication.
///
/// Manages the API key header and connection pooling. One call is one
/// upstream request unless `max_retries` is raised in config.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    default_model: String,
    max_retries: u32,
    base_url: String,
}

impl GeminiClient {
    /// Creates a client from the `[gemini]` section and a resolved API key.
    pub fn new(api_key: String, config: &GeminiConfig) -> Result<Self, SparkError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(&api_key)
            .map_err(|e| SparkError::Config(format!("invalid API key header value: {e}")))?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SparkError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            default_model: config.model.clone(),
            max_retries: config.max_retries,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the default model identifier.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.base_url)
    }

    /// Sends a non-streaming `generateContent` request.
    ///
    /// Transient statuses are retried up to `max_retries` times (default 0)
    /// with a 1-second delay between attempts.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, SparkError> {
        let url = self.endpoint(model);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying generateContent after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| SparkError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, model, "generateContent response");

            if status.is_success() {
                return response
                    .json::<GenerateContentResponse>()
                    .await
                    .map_err(|e| SparkError::Provider {
                        message: format!("failed to parse response: {e}"),
                        source: Some(Box::new(e)),
                    });
            }

            let body = response.text().await.unwrap_or_default();

            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, attempt, "transient error, will retry");
                debug!(body = %body, "transient error body");
                last_error = Some(SparkError::Provider {
                    message: format!("API returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            return Err(SparkError::Provider {
                message: describe_error(status, &body),
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| SparkError::Provider {
            message: "generateContent failed after retries".into(),
            source: None,
        }))
    }
}

/// Formats a non-success response, preferring the API's own error envelope.
fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!(
            "Gemini API error ({}): {}",
            api_err.error.status.as_deref().unwrap_or(status.as_str()),
            api_err.error.message
        ),
        Err(_) => format!("API returned {status}: {body}"),
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Content, Part};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/models/gemini-2.5-flash:generateContent";

    fn test_client(base_url: &str) -> GeminiClient {
        let config = GeminiConfig {
            base_url: base_url.to_string(),
            ..GeminiConfig::default()
        };
        GeminiClient::new("test-api-key".into(), &config).unwrap()
    }

    fn test_request() -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part::text("Hello")],
            }],
            system_instruction: None,
            tools: vec![],
        }
    }

    fn text_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 2}
        })
    }

    #[tokio::test]
    async fn generate_content_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("Hi there!")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client
            .generate_content("gemini-2.5-flash", &test_request())
            .await
            .unwrap();

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(
            result.candidates[0].content.as_ref().unwrap().parts[0].text.as_deref(),
            Some("Hi there!")
        );
    }

    #[tokio::test]
    async fn opted_in_retry_recovers_from_429() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "error": {"code": 429, "message": "Resource exhausted", "status": "RESOURCE_EXHAUSTED"}
        });

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(429).set_body_json(&error_body))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("After retry")))
            .mount(&server)
            .await;

        let config = GeminiConfig {
            base_url: server.uri(),
            max_retries: 1,
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new("test-api-key".into(), &config).unwrap();
        let result = client
            .generate_content("gemini-2.5-flash", &test_request())
            .await
            .unwrap();
        assert_eq!(
            result.candidates[0].content.as_ref().unwrap().parts[0].text.as_deref(),
            Some("After retry")
        );
    }

    #[tokio::test]
    async fn generate_content_fails_on_400() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
        });

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(400).set_body_json(&error_body))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .generate_content("gemini-2.5-flash", &test_request())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("INVALID_ARGUMENT"), "got: {err}");
        assert!(err.contains("API key not valid"), "got: {err}");
    }

    #[tokio::test]
    async fn upstream_503_fails_after_a_single_attempt() {
        let server = MockServer::start().await;
        let error_body = serde_json::json!({
            "error": {"code": 503, "message": "The model is overloaded", "status": "UNAVAILABLE"}
        });

        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(503).set_body_json(&error_body))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let started = std::time::Instant::now();
        let err = client
            .generate_content("gemini-2.5-flash", &test_request())
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("UNAVAILABLE"), "got: {err}");
        let hits = server.received_requests().await.unwrap().len();
        assert_eq!(hits, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn non_json_error_body_is_reported_raw() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .generate_content("gemini-2.5-flash", &test_request())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("404"), "got: {err}");
        assert!(err.contains("not here"), "got: {err}");
    }

    #[tokio::test]
    async fn client_sends_api_key_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header("x-goog-api-key", "test-api-key"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("ok")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let result = client
            .generate_content("gemini-2.5-flash", &test_request())
            .await;
        assert!(result.is_ok(), "headers should match: {result:?}");
    }

    #[test]
    fn trailing_slash_in_base_url_is_ignored() {
        let client = test_client("http://localhost:9/v1beta/");
        assert_eq!(
            client.endpoint("m"),
            "http://localhost:9/v1beta/models/m:generateContent"
        );
    }
}
