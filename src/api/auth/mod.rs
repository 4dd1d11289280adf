//! Login gate endpoints
//!
//! A single static password opens an in-memory session. This keeps casual
//! visitors out of the dashboard; it is not a security boundary.

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequireSession;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::infrastructure::session::Session;

pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(get_current_session))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub username: String,
    pub created_at: String,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            username: session.username,
            created_at: session.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .sessions
        .login(request.username.as_deref(), &request.password)?;

    Ok(Json(session.into()))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<LogoutResponse>, ApiError> {
    state.sessions.logout(&session.token)?;

    Ok(Json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// GET /auth/me
pub async fn get_current_session(
    RequireSession(session): RequireSession,
) -> Result<Json<SessionResponse>, ApiError> {
    Ok(Json(session.into()))
}
