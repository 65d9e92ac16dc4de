//! API request handling
//!
//! Reads the inbound body, turns it into a prompt (or a PDF extraction), and
//! maps every failure to a JSON error body tagged with the request id.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use key_pool::{Dispatcher, ErrorKind};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::error::{Error, Result};
use crate::metrics::{ServiceMetrics, record_request};
use crate::{pdf, prompts};

/// What the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    /// Review of a CV or profile
    Analyze,
    /// Orientation advice from a list of interests
    Explore,
}

impl AnalysisKind {
    pub fn label(self) -> &'static str {
        match self {
            AnalysisKind::Analyze => "analyze",
            AnalysisKind::Explore => "explore",
        }
    }
}

/// `cvText` is a string for `analyze` and a list for `explore`; either shape
/// is accepted for both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProfileInput {
    Text(String),
    List(Vec<String>),
}

impl ProfileInput {
    fn into_text(self) -> String {
        match self {
            ProfileInput::Text(text) => text,
            ProfileInput::List(lines) => lines.join("\n"),
        }
    }

    fn into_interests(self) -> Vec<String> {
        match self {
            ProfileInput::Text(text) => vec![text],
            ProfileInput::List(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(rename = "type")]
    pub kind: AnalysisKind,
    pub cv_text: ProfileInput,
    #[serde(default)]
    pub target_field: Option<String>,
}

/// Shared state for the API handlers
#[derive(Clone)]
pub struct AdvisorState {
    pub dispatcher: Arc<Dispatcher>,
    /// Language the feedback is written in
    pub language: Arc<str>,
    pub max_body_bytes: usize,
    pub metrics: ServiceMetrics,
}

/// Handle `POST /api/analyze`.
#[instrument(skip_all, fields(request_id = %request_id, kind = tracing::field::Empty))]
pub async fn analyze_request(
    state: &AdvisorState,
    request: Request<Body>,
    request_id: String,
) -> Response {
    let started = Instant::now();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let (kind, result) = match parse(state, request).await {
        Ok(req) => {
            let kind = req.kind.label();
            tracing::Span::current().record("kind", kind);
            (kind, run_analysis(state, req).await)
        }
        Err(err) => ("invalid", Err(err)),
    };

    let response = match result {
        Ok(text) => {
            info!(chars = text.len(), "analysis completed");
            (StatusCode::OK, axum::Json(serde_json::json!({ "text": text }))).into_response()
        }
        Err(err) => failure(state, &err, &request_id),
    };
    record_request(kind, response.status().as_u16(), started.elapsed().as_secs_f64());
    response
}

/// Handle `POST /api/extract`: raw PDF bytes in, `{text, pageCount}` out.
#[instrument(skip_all, fields(request_id = %request_id))]
pub async fn extract_request(
    state: &AdvisorState,
    request: Request<Body>,
    request_id: String,
) -> Response {
    let started = Instant::now();
    state.metrics.requests_total.fetch_add(1, Ordering::Relaxed);

    let result = match read_body(request, state.max_body_bytes).await {
        Ok(bytes) => pdf::extract(bytes).await,
        Err(err) => Err(err),
    };

    let response = match result {
        Ok(extract) => {
            info!(pages = extract.page_count, "PDF extracted");
            (StatusCode::OK, axum::Json(extract)).into_response()
        }
        Err(err) => failure(state, &err, &request_id),
    };
    record_request("extract", response.status().as_u16(), started.elapsed().as_secs_f64());
    response
}

async fn read_body(request: Request<Body>, limit: usize) -> Result<Bytes> {
    axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|e| Error::InvalidRequest(format!("invalid request body: {e}")))
}

async fn parse(state: &AdvisorState, request: Request<Body>) -> Result<AnalyzeRequest> {
    let bytes = read_body(request, state.max_body_bytes).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidRequest(format!("invalid request body: {e}")))
}

async fn run_analysis(state: &AdvisorState, req: AnalyzeRequest) -> Result<String> {
    let prompt = match req.kind {
        AnalysisKind::Analyze => prompts::analysis_prompt(
            &req.cv_text.into_text(),
            req.target_field.as_deref(),
            &state.language,
        )?,
        AnalysisKind::Explore => {
            prompts::exploration_prompt(&req.cv_text.into_interests(), &state.language)?
        }
    };
    Ok(state.dispatcher.dispatch(&prompt).await?)
}

/// Log the failure at a level matching who has to act on it, then render it.
fn failure(state: &AdvisorState, err: &Error, request_id: &str) -> Response {
    state.metrics.errors_total.fetch_add(1, Ordering::Relaxed);
    match err {
        Error::Dispatch(inner)
            if matches!(inner.kind(), ErrorKind::Configuration | ErrorKind::Fatal) =>
        {
            error!(error = %err, classification = err.label(), "request failed");
        }
        _ => warn!(error = %err, classification = err.label(), "request rejected"),
    }
    err.to_response(request_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analyze_request() {
        let req: AnalyzeRequest = serde_json::from_str(
            r#"{"type":"analyze","cvText":"Rust dev","targetField":"Backend"}"#,
        )
        .unwrap();
        assert_eq!(req.kind, AnalysisKind::Analyze);
        assert_eq!(req.target_field.as_deref(), Some("Backend"));
        assert_eq!(req.cv_text.into_text(), "Rust dev");
    }

    #[test]
    fn parses_explore_request_with_list() {
        let req: AnalyzeRequest =
            serde_json::from_str(r#"{"type":"explore","cvText":["AI","Design"]}"#).unwrap();
        assert_eq!(req.kind, AnalysisKind::Explore);
        assert!(req.target_field.is_none());
        assert_eq!(req.cv_text.into_interests(), vec!["AI", "Design"]);
    }

    #[test]
    fn single_string_is_one_interest() {
        let input = ProfileInput::Text("Robotics".into());
        assert_eq!(input.into_interests(), vec!["Robotics"]);
    }

    #[test]
    fn list_profile_is_joined_by_lines() {
        let input = ProfileInput::List(vec!["Name: Jane".into(), "Skills: Go".into()]);
        assert_eq!(input.into_text(), "Name: Jane\nSkills: Go");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result = serde_json::from_str::<AnalyzeRequest>(r#"{"type":"summarize","cvText":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn missing_cv_text_is_rejected() {
        let result = serde_json::from_str::<AnalyzeRequest>(r#"{"type":"analyze"}"#);
        assert!(result.is_err());
    }
}
