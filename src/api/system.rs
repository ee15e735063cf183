use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use super::{ApiError, ApiResponse, AppState, StateCount, TagCount};

const TOP_AGGREGATE_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total: u64,
    pub call: u64,
    pub otp: u64,
    pub top_tags: Vec<TagCount>,
    pub top_states: Vec<StateCount>,
    pub timestamp: String,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let timestamp = chrono::Utc::now().to_rfc3339();

    match state.store.ping().await {
        Ok(()) => Json(HealthResponse {
            status: "healthy",
            database: "connected",
            timestamp,
        })
        .into_response(),
        Err(err) => {
            error!(error = %err, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse {
                    status: "unhealthy",
                    database: "disconnected",
                    timestamp,
                }),
            )
                .into_response()
        }
    }
}

/// GET /stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<StatsResponse>>, ApiError> {
    use crate::models::PhoneMode;

    let total = state.store.count_numbers(None).await?;
    let call = state.store.count_numbers(Some(PhoneMode::Call)).await?;
    let otp = state.store.count_numbers(Some(PhoneMode::Otp)).await?;

    let top_tags = state
        .store
        .tag_frequencies(Some(TOP_AGGREGATE_LIMIT))
        .await?
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();

    let top_states = state
        .store
        .state_frequencies(Some(TOP_AGGREGATE_LIMIT as u64))
        .await?
        .into_iter()
        .map(|(state, count)| StateCount { state, count })
        .collect();

    Ok(Json(ApiResponse::success(StatsResponse {
        total,
        call,
        otp,
        top_tags,
        top_states,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })))
}
