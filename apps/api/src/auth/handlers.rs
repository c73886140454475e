//! Axum route handlers for the shared-password login flow.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub token: String,
}

/// POST /api/v1/auth/login
///
/// Exchanges the shared password for an opaque session token. Rejected when
/// the password is wrong or when no password is configured at all.
pub async fn handle_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let expected = state
        .config
        .auth_password
        .as_deref()
        .ok_or(AppError::Unauthorized)?;
    if request.password != expected {
        return Err(AppError::Unauthorized);
    }

    let session = state.sessions.create();
    info!("session issued, expires {}", session.expires_at);
    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
    }))
}

/// POST /api/v1/auth/logout
///
/// Drops the session immediately. Always succeeds; expiring an unknown
/// token is a no-op.
pub async fn handle_logout(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> StatusCode {
    state.sessions.expire(&request.token);
    StatusCode::NO_CONTENT
}
