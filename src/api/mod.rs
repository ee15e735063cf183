use axum::{
    Json, Router,
    http::{HeaderValue, StatusCode},
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{AuthStrategy, Config};
use crate::db::Store;
use crate::geo::AreaCodeTable;
use crate::services::AuthService;

pub mod auth;
mod error;
pub mod lookup;
pub mod numbers;
pub mod system;
mod types;

pub use error::ApiError;
pub use types::*;

pub struct AppState {
    pub config: Config,

    pub store: Store,

    pub auth: AuthService,

    pub geo: AreaCodeTable,
}

/// Builds the fully wired application state: store connected and migrated,
/// geo table loaded, auth strategy ready (bootstrapping the first admin
/// account when needed).
pub async fn create_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.database.path,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;

    if config.auth.strategy == AuthStrategy::Account && store.admin_count().await? == 0 {
        anyhow::ensure!(
            !config.auth.admin_password.is_empty(),
            "No admin account exists; set CALLBOARD_ADMIN_PASSWORD to bootstrap one"
        );
        store
            .create_admin(&config.auth.admin_username, &config.auth.admin_password)
            .await?;
        tracing::info!(username = %config.auth.admin_username, "Bootstrapped admin account");
    }

    let geo = AreaCodeTable::load(config.geo.table_path.as_deref())?;

    let auth = AuthService::new(config.auth.clone(), store.clone());

    Ok(Arc::new(AppState {
        config,
        store,
        auth,
        geo,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let protected_routes = Router::new()
        .route("/verify", get(auth::verify))
        .route("/numbers", get(numbers::list_numbers))
        .route("/add-number", post(numbers::add_number))
        .route("/update-number", put(numbers::update_number))
        .route("/update-number/{id}", put(numbers::update_number_by_path))
        .route("/update-mode", put(numbers::update_mode))
        .route("/delete-number/{id}", delete(numbers::delete_number))
        .route("/bulk-add", post(numbers::bulk_add))
        .route("/search", get(numbers::search_numbers))
        .route("/stats", get(system::stats))
        .route("/tags", get(numbers::list_tags))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .merge(protected_routes)
        .route("/login", post(auth::login))
        .route("/lookup", post(lookup::lookup))
        .route("/health", get(system::health))
        .fallback(not_found)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error("Route not found")),
    )
}
