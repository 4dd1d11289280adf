use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use super::auth;
use super::dashboard;
use super::health;
use super::middleware::logging_middleware;
use super::state::AppState;
use super::types::ApiError;

/// Create the full router with application state
///
/// `max_upload_bytes` bounds every request body, multipart uploads included.
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Login gate
        .nest("/auth", auth::create_auth_router())
        // Model, scoring and training
        .merge(dashboard::create_dashboard_router())
        .fallback(|| async { ApiError::not_found("No such endpoint") })
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}
