use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::{ApiError, AppState};
use crate::geo::normalize_number;

/// Webhook-style fields as sent by the telephony provider, accepted from the
/// JSON body or the query string.
#[derive(Debug, Default, Deserialize)]
pub struct LookupParams {
    #[serde(rename = "Called")]
    pub called: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    pub called_number: String,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_sid: Option<String>,
}

/// POST /lookup
///
/// Public endpoint driven by the telephony webhook. A miss is a normal
/// answer (`mode: "UNKNOWN"`), never a client error.
pub async fn lookup(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LookupParams>,
    body: Bytes,
) -> Result<Json<LookupResponse>, ApiError> {
    // The provider controls the body; anything unreadable is treated as
    // absent rather than rejected.
    let body: LookupParams = serde_json::from_slice(&body).unwrap_or_default();

    // `Called` wins over `To`, body over query, matching the webhook contract.
    let called_raw = body
        .called
        .or(query.called)
        .or(body.to)
        .or(query.to)
        .unwrap_or_default();
    let from = body.from.or(query.from);
    let call_sid = body.call_sid.or(query.call_sid);

    let called = normalize_number(&called_raw);

    let found = if called.is_empty() {
        None
    } else {
        state.store.get_number_by_value(&called).await?
    };

    let mode = match found {
        Some(entry) => {
            state.store.record_number_usage(entry.id).await?;
            info!(number = %entry.number, mode = %entry.mode, "Lookup hit");
            entry.mode
        }
        None => {
            info!(number = %called, "Lookup miss");
            "UNKNOWN".to_string()
        }
    };

    Ok(Json(LookupResponse {
        called_number: called,
        mode,
        from,
        call_sid,
    }))
}
