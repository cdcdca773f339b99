use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(handlers::health_check))
        .route("/run", post(handlers::run_submission))
        .route("/extract", post(handlers::extract_cases))
        .route("/analytics/progress", post(handlers::progress))
        .route("/metrics", get(handlers::metrics))
}
