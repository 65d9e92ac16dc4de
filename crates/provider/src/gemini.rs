//! Gemini `generateContent` provider
//!
//! One POST per call to `{base_url}/v1beta/models/{model}:generateContent`,
//! authenticated with the `x-goog-api-key` header. Error bodies follow Google's
//! `{"error": {"code", "message", "status"}}` envelope; the `status` string
//! (e.g. `RESOURCE_EXHAUSTED`) is kept in the failure message so classification
//! can see it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{GenerateFuture, Provider, ProviderError, Result, UpstreamFailure};

/// Public Gemini API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Upper bound on raw error body text carried into a failure message.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts. Empty when the
    /// response carries no candidate (e.g. blocked by safety filters).
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}

/// Client for the Gemini text-generation API.
pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Build a provider with its own HTTP client bounded by `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(ProviderError::Config("model must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;
        Ok(Self::new(client, base_url, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Full `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    async fn call(
        &self,
        api_key: &str,
        prompt: &str,
    ) -> std::result::Result<String, UpstreamFailure> {
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamFailure::transport(format!("request to Gemini failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(UpstreamFailure::http(status.as_u16(), error_message(&body)));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            UpstreamFailure::http(status.as_u16(), format!("invalid Gemini response: {e}"))
        })?;
        let text = parsed.into_text();
        debug!(model = %self.model, chars = text.len(), "Gemini call succeeded");
        Ok(text)
    }
}

impl Provider for GeminiProvider {
    fn id(&self) -> &str {
        "gemini"
    }

    fn generate<'a>(&'a self, api_key: &'a str, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(self.call(api_key, prompt))
    }
}

/// Extract `STATUS: message` from a Google error envelope, or fall back to the
/// (truncated) raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{status}: {}", envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) => body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio::net::TcpListener;

    /// Start a mock upstream that answers every request with `status` and `body`.
    async fn start_mock(status: StatusCode, body: serde_json::Value) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let app = axum::Router::new().fallback(move || {
            let body = body.clone();
            async move { (status, axum::Json(body)) }
        });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        url
    }

    /// Start a mock upstream that echoes the key header, path and prompt back
    /// as generated text.
    async fn start_echo() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let app = axum::Router::new().fallback(|request: Request<Body>| async move {
            let key = request
                .headers()
                .get("x-goog-api-key")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let path = request.uri().path().to_string();
            let bytes = axum::body::to_bytes(request.into_body(), 1024 * 1024)
                .await
                .unwrap();
            let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            let prompt = json["contents"][0]["parts"][0]["text"]
                .as_str()
                .unwrap_or("")
                .to_string();
            axum::Json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [
                            { "text": format!("key={key};") },
                            { "text": format!("path={path};") },
                            { "text": format!("prompt={prompt}") }
                        ]
                    }
                }]
            }))
        });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        url
    }

    fn provider(base_url: &str) -> GeminiProvider {
        GeminiProvider::with_timeout(base_url, DEFAULT_MODEL, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn endpoint_joins_base_url_and_model() {
        let p = provider("https://generativelanguage.googleapis.com/");
        assert_eq!(p.model(), DEFAULT_MODEL);
        assert_eq!(
            p.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn empty_model_rejected() {
        let result = GeminiProvider::with_timeout(DEFAULT_BASE_URL, "  ", Duration::from_secs(5));
        assert!(matches!(result, Err(ProviderError::Config(_))));
    }

    #[tokio::test]
    async fn sends_key_header_and_concatenates_parts() {
        let url = start_echo().await;
        let p = provider(&url);

        let text = p.generate("key-A", "Review my CV").await.unwrap();

        assert_eq!(
            text,
            "key=key-A;path=/v1beta/models/gemini-2.5-flash:generateContent;prompt=Review my CV"
        );
    }

    #[tokio::test]
    async fn quota_error_keeps_status_and_google_status_string() {
        let url = start_mock(
            StatusCode::TOO_MANY_REQUESTS,
            serde_json::json!({
                "error": {
                    "code": 429,
                    "message": "You exceeded your current quota",
                    "status": "RESOURCE_EXHAUSTED"
                }
            }),
        )
        .await;

        let failure = provider(&url).generate("key-A", "hi").await.unwrap_err();

        assert_eq!(failure.status, Some(429));
        assert_eq!(
            failure.message,
            "RESOURCE_EXHAUSTED: You exceeded your current quota"
        );
    }

    #[tokio::test]
    async fn invalid_key_error_is_reported_verbatim() {
        let url = start_mock(
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT"
                }
            }),
        )
        .await;

        let failure = provider(&url).generate("bad", "hi").await.unwrap_err();

        assert_eq!(failure.status, Some(400));
        assert!(failure.message.contains("API key not valid"), "got: {failure}");
    }

    #[tokio::test]
    async fn missing_candidates_yield_empty_text() {
        let url = start_mock(
            StatusCode::OK,
            serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
        )
        .await;

        let text = provider(&url).generate("key-A", "hi").await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_transport_failure() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let failure = provider(&url).generate("key-A", "hi").await.unwrap_err();
        assert_eq!(failure.status, None);
        assert!(failure.message.starts_with("request to Gemini failed"));
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("  upstream exploded  "), "upstream exploded");
        let long = "x".repeat(2000);
        assert_eq!(error_message(&long).len(), MAX_ERROR_BODY_CHARS);
    }

    #[test]
    fn error_message_without_status_uses_message_only() {
        let body = r#"{"error":{"code":404,"message":"models/unknown is not found"}}"#;
        assert_eq!(error_message(body), "models/unknown is not found");
    }
}
