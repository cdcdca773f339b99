// HTTP route handlers for the Assessor API

use assessor_common::types::{AttemptRecord, Challenge, Language, TestCase};
use assessor_engine::analytics;
use assessor_engine::cancel::cancel_pair;
use assessor_engine::extractor;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    #[serde(flatten)]
    pub challenge: Challenge,
    pub language: Language,
    pub source_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub statement: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub count: usize,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub attempts: Vec<AttemptRecord>,
    #[serde(default)]
    pub window_days: Option<u32>,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// POST /run - Grade a submission against the statement's examples
///
/// The run is spawned so it survives independently of the request future;
/// if the client disconnects, the dropped guard cancels it.
pub async fn run_submission(State(state): State<Arc<AppState>>, Json(payload): Json<RunRequest>) -> Response {
    let (handle, signal) = cancel_pair();
    let guard = handle.guard();
    let orchestrator = state.orchestrator.clone();
    let started = Instant::now();

    info!(
        language = %payload.language,
        challenge_id = payload.challenge.id.as_deref().unwrap_or("-"),
        source_bytes = payload.source_code.len(),
        "Run requested"
    );

    let task = tokio::spawn(async move {
        orchestrator
            .run(&payload.challenge, &payload.source_code, payload.language, &signal)
            .await
    });

    match task.await {
        Ok(summary) => {
            guard.disarm();
            state.metrics.observe(&summary, started.elapsed());
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Run task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("run failed: {}", e))
        }
    }
}

/// POST /extract - Preview the test cases found in a statement
pub async fn extract_cases(Json(payload): Json<ExtractRequest>) -> impl IntoResponse {
    let test_cases = extractor::extract(&payload.statement);
    Json(ExtractResponse {
        count: test_cases.len(),
        test_cases,
    })
}

/// POST /analytics/progress - Aggregate an attempt history
pub async fn progress(State(state): State<Arc<AppState>>, Json(payload): Json<ProgressRequest>) -> impl IntoResponse {
    let now = payload.now.unwrap_or_else(Utc::now);
    let window_days = payload.window_days.unwrap_or(state.config.trend_window_days);
    Json(analytics::progress_report(&payload.attempts, now, window_days))
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
