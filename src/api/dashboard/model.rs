//! Active model endpoints

use axum::extract::State;
use tracing::info;

use crate::api::middleware::RequireSession;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ModelInfoResponse};

/// GET /model
pub async fn get_model(
    State(state): State<AppState>,
    _session: RequireSession,
) -> Result<Json<ModelInfoResponse>, ApiError> {
    let model = state.registry.current().await?;
    Ok(Json(ModelInfoResponse::from_artifact(&model)))
}

/// POST /model/activate
///
/// Re-reads the artifact and swaps it in; on failure the previous model stays active.
pub async fn activate_model(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<ModelInfoResponse>, ApiError> {
    info!(username = %session.username, source = %state.registry.describe_source(), "Activating model");

    let model = state.registry.activate().await?;
    Ok(Json(ModelInfoResponse::from_artifact(&model)))
}
