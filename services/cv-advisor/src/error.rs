//! Per-request failures and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use key_pool::ErrorKind;
use provider::ErrorClassification;
use thiserror::Error;

/// Message returned for every PDF extraction failure.
pub const EXTRACTION_FAILED: &str =
    "Failed to extract text from the PDF file. Please ensure it is a valid text-based PDF.";

/// A failed API request.
///
/// Lifecycle failures (bad config, bind errors) go through `anyhow` in `main`
/// instead; these only ever become HTTP responses.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Dispatch(#[from] key_pool::Error),

    #[error("PDF extraction failed: {0}")]
    Extraction(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Dispatch(err) => match err.kind() {
                ErrorKind::Configuration => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::EmptyPayload => StatusCode::BAD_REQUEST,
                ErrorKind::PoolExhausted => match err.classification() {
                    Some(ErrorClassification::EmptyResponse) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::TOO_MANY_REQUESTS,
                },
                ErrorKind::Fatal => match err.classification() {
                    Some(ErrorClassification::InvalidCredential) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    _ => StatusCode::BAD_GATEWAY,
                },
            },
        }
    }

    /// Stable tag for the `classification` field of error bodies.
    pub fn label(&self) -> &'static str {
        match self {
            Error::InvalidRequest(_) => "invalid_request",
            Error::Extraction(_) => "extraction",
            Error::Dispatch(err) if err.kind() == ErrorKind::EmptyPayload => "invalid_request",
            Error::Dispatch(err) => err.label(),
        }
    }

    /// Short, actionable text for the end user. Upstream detail stays in logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidRequest(msg) => msg.clone(),
            Error::Extraction(_) => EXTRACTION_FAILED.to_string(),
            Error::Dispatch(err) => match err.kind() {
                ErrorKind::Configuration => {
                    "The AI service is not configured. Please contact the administrator.".into()
                }
                ErrorKind::EmptyPayload => "Profile text must not be empty.".into(),
                ErrorKind::PoolExhausted => match err.classification() {
                    Some(ErrorClassification::EmptyResponse) => {
                        "The AI returned no answer. Please try rephrasing your input.".into()
                    }
                    _ => "All API keys have reached their usage limit. Please try again later."
                        .into(),
                },
                ErrorKind::Fatal => match err.classification() {
                    Some(ErrorClassification::InvalidCredential) => {
                        "The AI service rejected its API key. Please contact the administrator."
                            .into()
                    }
                    _ => "The AI service could not complete the request. Please try again.".into(),
                },
            },
        }
    }

    /// JSON error body: `{"error", "classification", "request_id"}`.
    pub fn to_response(&self, request_id: &str) -> Response {
        let body = serde_json::json!({
            "error": self.user_message(),
            "classification": self.label(),
            "request_id": request_id,
        });
        (
            self.status(),
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
