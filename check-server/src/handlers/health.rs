//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    cached_urls: usize,
    /// Cached URLs by state
    pending: usize,
    ready: usize,
    failed: usize,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (pending, ready, failed) = state.evaluator.cache().stats();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        cached_urls: pending + ready + failed,
        pending,
        ready,
        failed,
    })
}
