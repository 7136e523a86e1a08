//! HTTP trigger
//!
//! Exposes one ingestion invocation per request, for schedulers that can
//! only call a URL. Only one run may be in flight per process.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use ioc_common::IngestError;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, Level};

use crate::config::IngestConfig;

/// State shared by the trigger handlers
#[derive(Clone)]
pub struct TriggerState {
    config: Arc<IngestConfig>,
    running: Arc<Mutex<()>>,
}

impl TriggerState {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config: Arc::new(config),
            running: Arc::new(Mutex::new(())),
        }
    }
}

/// Build the trigger router
pub fn router(state: TriggerState) -> Router {
    Router::new()
        .route("/", get(invoke).post(invoke))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Run one ingestion invocation
async fn invoke(State(state): State<TriggerState>) -> Response {
    let Ok(_guard) = state.running.try_lock() else {
        return (StatusCode::CONFLICT, "ingestion already running").into_response();
    };

    let config = state.config.for_invocation();
    match crate::ingest(&config).await {
        Ok(report) => (StatusCode::OK, report.outcome.as_str()).into_response(),
        Err(e) => {
            error!(error = %e, "Ingestion run failed");
            error_response(&e)
        },
    }
}

/// Map a failed run onto the trigger response
///
/// A sink rejection is relayed as-is so the scheduler sees the sink's own
/// status and body.
pub fn error_response(err: &IngestError) -> Response {
    match err {
        IngestError::UploadFailed { status, body } => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, body.clone()).into_response()
        },
        IngestError::FetchFailed { .. } | IngestError::Http(_) => {
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        },
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

/// Health check handler
async fn health_check(State(state): State<TriggerState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "running": state.running.try_lock().is_err(),
            "checkpoint_key": state.config.checkpoint_key,
        })),
    )
}
