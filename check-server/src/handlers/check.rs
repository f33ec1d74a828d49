//! URL check handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use phishguard_core::logic::evaluator::Verdict;

use crate::{AppError, AppResult, AppState};

const PENDING_MESSAGE: &str = "Please wait for a moment!";

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    #[serde(flatten)]
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

/// Evaluate one URL. A body that is missing, unparseable or without a
/// non-empty `url` is a 400.
pub async fn check_url(
    State(state): State<AppState>,
    payload: Option<Json<CheckRequest>>,
) -> AppResult<Json<CheckResponse>> {
    // the key is the string as sent; blank only counts as missing
    let url = payload
        .and_then(|Json(req)| req.url)
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::ValidationError("URL is required".to_string()))?;

    // rendering and lookups block for seconds
    let evaluator = state.evaluator.clone();
    let verdict = tokio::task::spawn_blocking(move || evaluator.evaluate(&url)).await?;

    if verdict.pending {
        tracing::debug!("{} is still being evaluated", verdict.url);
    }

    let error = verdict.pending.then_some(PENDING_MESSAGE);
    Ok(Json(CheckResponse { verdict, error }))
}
