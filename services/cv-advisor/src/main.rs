//! CV Advisor
//!
//! Single-binary Rust service that:
//! 1. Reads a pool of Gemini API keys from the environment
//! 2. Accepts CV analysis and interest-exploration requests over HTTP
//! 3. Builds the prompt and sends it through the key-rotating dispatcher
//! 4. Extracts text from uploaded PDF CVs

mod analyze;
mod check;
mod config;
mod error;
mod metrics;
mod pdf;
mod prompts;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::{Method, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use key_pool::Dispatcher;
use metrics_exporter_prometheus::PrometheusHandle;
use provider::GeminiProvider;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::analyze::AdvisorState;
use crate::config::Config;
use crate::metrics::ServiceMetrics;

/// Time allowed for in-flight requests to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    advisor: AdvisorState,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// Requests beyond `max_connections` queue in the concurrency limit layer.
/// CORS is open to any origin so the browser front end can call the API
/// directly.
fn build_router(state: AppState, max_connections: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route("/api/extract", post(extract_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        // Logs go to stderr so stdout carries only the --check-keys report
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    // CLI: --config <path> and --check-keys
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());
    let check_mode = args.iter().any(|a| a == "--check-keys");

    info!(check_mode, "starting cv-advisor");

    let config = match Config::resolve_path(cli_config_path) {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            Config::load(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => {
            info!("no config file found, using defaults");
            Config::defaults().context("invalid default configuration")?
        }
    };

    info!(
        listen_addr = %config.server.listen_addr,
        language = %config.advisor.language,
        "configuration loaded"
    );

    let provider = GeminiProvider::with_timeout(
        config.gemini.base_url.clone(),
        config.gemini.model.clone(),
        Duration::from_secs(config.gemini.timeout_secs),
    )
    .context("failed to build Gemini client")?;
    info!(model = provider.model(), endpoint = %provider.endpoint(), "Gemini client ready");

    let dispatcher = Dispatcher::new(config.api_keys.clone(), Arc::new(provider))
        .with_backoff(Duration::from_millis(config.dispatch.backoff_ms));
    if dispatcher.is_empty() {
        error!("no API keys found; set GEMINI_API_KEY_1 to GEMINI_API_KEY_4");
    } else {
        info!(
            keys = dispatcher.len(),
            backoff_ms = dispatcher.backoff().as_millis() as u64,
            "key rotation ready"
        );
    }

    if check_mode {
        let checks = check::check_keys(&dispatcher, check::PAUSE_BETWEEN_KEYS).await;
        print!("{}", check::summary(&checks));
        std::process::exit(check::exit_code(&checks));
    }

    // Install Prometheus metrics recorder before any request is served
    let prometheus_handle = metrics::install_recorder()?;

    let app_state = AppState {
        advisor: AdvisorState {
            dispatcher: Arc::new(dispatcher),
            language: Arc::from(config.advisor.language.as_str()),
            max_body_bytes: config.server.max_body_bytes,
            metrics: ServiceMetrics::new(),
        },
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts: notify the server to drain, then race it against the timer.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;

    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: uptime, request counters and the key pool summary.
/// Returns 200 when at least one key is configured, 503 when degraded.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let advisor = &state.advisor;
    let uptime = advisor.metrics.started_at.elapsed().as_secs();
    let requests = advisor.metrics.requests_total.load(Ordering::Relaxed);
    let errors = advisor.metrics.errors_total.load(Ordering::Relaxed);

    let (status_code, status) = if advisor.dispatcher.is_empty() {
        (axum::http::StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (axum::http::StatusCode::OK, "healthy")
    };

    let body = serde_json::json!({
        "status": status,
        "uptime_seconds": uptime,
        "requests_served": requests,
        "errors_total": errors,
        "pool": advisor.dispatcher.health(),
    });

    (
        status_code,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}

async fn analyze_handler(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> Response {
    analyze::analyze_request(&state.advisor, request, new_request_id()).await
}

async fn extract_handler(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> Response {
    analyze::extract_request(&state.advisor, request, new_request_id()).await
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
