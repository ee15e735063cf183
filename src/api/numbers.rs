use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::{ApiError, ApiResponse, AppState, PhoneNumberDto, TagCount};
use crate::db::{InsertOutcome, NewNumber, NumberFilter, NumberPatch};
use crate::geo::normalize_number;
use crate::models::PhoneMode;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub tag: Option<String>,
    pub mode: Option<String>,
    pub q: Option<String>,
    /// Alias for `q`, kept for the panel.
    pub search: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddNumberRequest {
    pub number: Option<String>,
    pub mode: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateNumberRequest {
    pub id: Option<i32>,
    pub mode: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateModeRequest {
    pub id: Option<i32>,
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAddRequest {
    pub numbers: Option<Vec<BulkAddItem>>,
}

#[derive(Debug, Deserialize)]
pub struct BulkAddItem {
    pub number: Option<String>,
    pub mode: Option<String>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkAddResults {
    pub added: Vec<PhoneNumberDto>,
    pub skipped: Vec<BulkSkipped>,
    pub errors: Vec<BulkError>,
}

#[derive(Debug, Serialize)]
pub struct BulkSkipped {
    pub number: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct BulkError {
    pub number: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: SearchEcho,
    pub count: usize,
    pub numbers: Vec<PhoneNumberDto>,
}

#[derive(Debug, Serialize)]
pub struct SearchEcho {
    pub q: Option<String>,
    pub mode: Option<String>,
    pub state: Option<String>,
}

fn sanitize_tags(tags: Vec<String>) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}

fn filter_from_query(query: &ListQuery) -> NumberFilter {
    NumberFilter {
        q: query.q.clone().or_else(|| query.search.clone()),
        // An unrecognized mode value filters nothing rather than failing.
        mode: query.mode.as_deref().and_then(PhoneMode::parse),
        state: query.state.as_deref().map(str::trim).map(String::from),
        tag: query.tag.as_deref().map(|t| t.trim().to_lowercase()),
    }
}

/// GET /numbers
pub async fn list_numbers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<PhoneNumberDto>>>, ApiError> {
    let filter = filter_from_query(&query);
    let numbers = state.store.list_numbers(&filter).await?;
    let dtos: Vec<PhoneNumberDto> = numbers.into_iter().map(PhoneNumberDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

/// POST /add-number
pub async fn add_number(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddNumberRequest>,
) -> Result<Json<ApiResponse<PhoneNumberDto>>, ApiError> {
    let mode = payload
        .mode
        .as_deref()
        .ok_or_else(|| ApiError::validation("Number and mode are required"))?;
    let mode =
        PhoneMode::parse(mode).ok_or_else(|| ApiError::validation("Mode must be CALL or OTP"))?;

    let number = normalize_number(payload.number.as_deref().unwrap_or_default());
    if number.is_empty() {
        return Err(ApiError::validation("Invalid number format"));
    }

    let tags = sanitize_tags(payload.tags.unwrap_or_default());
    let notes = payload.notes.unwrap_or_default();
    let state_name = payload
        .state
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(|| state.geo.detect_state(&number).to_string(), String::from);

    let outcome = state
        .store
        .insert_number(NewNumber {
            number,
            mode,
            tags,
            notes,
            state: state_name,
        })
        .await?;

    match outcome {
        InsertOutcome::Inserted(model) => {
            info!(number = %model.number, mode = %model.mode, state = %model.state, "Number added");
            Ok(Json(ApiResponse::success_with_message(
                "Number added successfully",
                PhoneNumberDto::from(model),
            )))
        }
        InsertOutcome::Duplicate => Err(ApiError::duplicate_number()),
    }
}

fn patch_from_request(request: UpdateNumberRequest) -> NumberPatch {
    NumberPatch {
        // Only supplied, valid fields change; an invalid mode is ignored.
        mode: request.mode.as_deref().and_then(PhoneMode::parse),
        tags: request.tags.map(sanitize_tags),
        notes: request.notes,
        state: request
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
    }
}

async fn apply_update(
    state: &AppState,
    id: i32,
    patch: NumberPatch,
) -> Result<Json<ApiResponse<PhoneNumberDto>>, ApiError> {
    let updated = state
        .store
        .update_number(id, patch)
        .await?
        .ok_or_else(ApiError::number_not_found)?;

    Ok(Json(ApiResponse::success_with_message(
        "Number updated successfully",
        PhoneNumberDto::from(updated),
    )))
}

/// PUT /update-number (id in the body)
pub async fn update_number(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateNumberRequest>,
) -> Result<Json<ApiResponse<PhoneNumberDto>>, ApiError> {
    let id = payload
        .id
        .ok_or_else(|| ApiError::validation("ID is required"))?;
    apply_update(&state, id, patch_from_request(payload)).await
}

/// PUT /update-number/{id}
pub async fn update_number_by_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateNumberRequest>,
) -> Result<Json<ApiResponse<PhoneNumberDto>>, ApiError> {
    apply_update(&state, id, patch_from_request(payload)).await
}

/// PUT /update-mode
/// Legacy route kept for panel compatibility: changes the mode only.
pub async fn update_mode(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateModeRequest>,
) -> Result<Json<ApiResponse<PhoneNumberDto>>, ApiError> {
    let (Some(id), Some(mode)) = (payload.id, payload.mode.as_deref()) else {
        return Err(ApiError::validation("ID and mode are required"));
    };
    let mode =
        PhoneMode::parse(mode).ok_or_else(|| ApiError::validation("Mode must be CALL or OTP"))?;

    let patch = NumberPatch {
        mode: Some(mode),
        ..NumberPatch::default()
    };

    let updated = state
        .store
        .update_number(id, patch)
        .await?
        .ok_or_else(ApiError::number_not_found)?;

    Ok(Json(ApiResponse::success_with_message(
        "Mode updated successfully",
        PhoneNumberDto::from(updated),
    )))
}

/// DELETE /delete-number/{id}
pub async fn delete_number(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    let deleted = state.store.delete_number(id).await?;
    if deleted {
        Ok(Json(ApiResponse::success_with_message(
            "Number deleted successfully",
            true,
        )))
    } else {
        Err(ApiError::number_not_found())
    }
}

/// POST /bulk-add
/// Items are processed independently; one bad entry never aborts the batch.
pub async fn bulk_add(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BulkAddRequest>,
) -> Result<Json<ApiResponse<BulkAddResults>>, ApiError> {
    let items = payload
        .numbers
        .filter(|numbers| !numbers.is_empty())
        .ok_or_else(|| ApiError::validation("Numbers array is required"))?;

    let mut results = BulkAddResults {
        added: Vec::new(),
        skipped: Vec::new(),
        errors: Vec::new(),
    };

    for item in items {
        let raw = item.number.unwrap_or_default();
        let number = normalize_number(&raw);
        if number.is_empty() {
            results.errors.push(BulkError {
                number: raw,
                error: "Invalid number".to_string(),
            });
            continue;
        }

        let mode = item
            .mode
            .as_deref()
            .and_then(PhoneMode::parse)
            .unwrap_or_default();
        let tags = sanitize_tags(item.tags.unwrap_or_default());
        let notes = item.notes.unwrap_or_default();
        let state_name = item
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| state.geo.detect_state(&number).to_string(), String::from);

        match state
            .store
            .insert_number(NewNumber {
                number: number.clone(),
                mode,
                tags,
                notes,
                state: state_name,
            })
            .await
        {
            Ok(InsertOutcome::Inserted(model)) => results.added.push(PhoneNumberDto::from(model)),
            Ok(InsertOutcome::Duplicate) => results.skipped.push(BulkSkipped {
                number,
                reason: "Already exists".to_string(),
            }),
            Err(err) => {
                error!(number = %number, error = %err, "Bulk add item failed");
                results.errors.push(BulkError {
                    number,
                    error: "Failed to insert".to_string(),
                });
            }
        }
    }

    let message = format!(
        "Bulk add: {} added, {} skipped, {} errors",
        results.added.len(),
        results.skipped.len(),
        results.errors.len()
    );

    Ok(Json(ApiResponse::success_with_message(message, results)))
}

/// GET /search
pub async fn search_numbers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    let filter = filter_from_query(&query);
    let numbers = state.store.list_numbers(&filter).await?;
    let dtos: Vec<PhoneNumberDto> = numbers.into_iter().map(PhoneNumberDto::from).collect();

    Ok(Json(ApiResponse::success(SearchResponse {
        query: SearchEcho {
            q: filter.q,
            mode: filter.mode.map(|m| m.as_str().to_string()),
            state: filter.state,
        },
        count: dtos.len(),
        numbers: dtos,
    })))
}

/// GET /tags
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<TagCount>>>, ApiError> {
    let frequencies = state.store.tag_frequencies(None).await?;
    let tags = frequencies
        .into_iter()
        .map(|(tag, count)| TagCount { tag, count })
        .collect();
    Ok(Json(ApiResponse::success(tags)))
}
