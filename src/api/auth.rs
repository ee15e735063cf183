use axum::{
    Extension, Json,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::services::{Claims, LoginRequest};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub username: String,
    pub role: String,
}

impl From<Claims> for UserDto {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.sub,
            role: claims.role,
        }
    }
}

/// Gate for every protected route: a valid bearer token is required before
/// any handler logic runs. Verified claims travel on as a request extension.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let claims = state.auth.verify(token)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let outcome = state.auth.login(payload).await?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token: outcome.token,
        user: outcome.claims.into(),
    })))
}

/// GET /verify
/// Echoes the identity carried by the presented token.
pub async fn verify(
    Extension(claims): Extension<Claims>,
) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(claims.into()))
}
