//! Auth endpoints

use axum::{extract::State, response::Json};

use super::blocking;
use super::dto::*;
use crate::AppState;
use crate::auth::BearerToken;
use crate::error::AppError;
use crate::service::NewUser;

/// POST /auth/register/v2
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let identity = state.identity();
    let user_id = blocking(move || {
        identity.register(NewUser {
            email: req.email,
            password: req.password,
            name_first: req.name_first,
            name_last: req.name_last,
        })
    })
    .await?;

    let token = state.sessions.issue(user_id)?;
    Ok(Json(AuthResponse {
        token,
        auth_user_id: user_id,
    }))
}

/// POST /auth/login/v2
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let identity = state.identity();
    let user_id = blocking(move || identity.login(&req.email, &req.password)).await?;

    let token = state.sessions.issue(user_id)?;
    tracing::info!(user_id = %user_id, "User logged in");
    Ok(Json(AuthResponse {
        token,
        auth_user_id: user_id,
    }))
}

/// POST /auth/logout/v1
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<LogoutResponse>, AppError> {
    let user_id = state.sessions.resolve(&token)?;
    let is_success = state.sessions.revoke(&token);

    tracing::info!(user_id = %user_id, "User logged out");
    Ok(Json(LogoutResponse { is_success }))
}

/// POST /auth/passwordreset/request/v1
///
/// Succeeds silently for unknown addresses.
pub async fn password_reset_request(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<Json<Empty>, AppError> {
    if let Some((user_id, code)) = state.identity().request_password_reset(&req.email) {
        state.sessions.revoke_user(user_id);
        state.mailer.send_reset_code(user_id, &req.email, &code);
    }
    Ok(Json(Empty {}))
}

/// POST /auth/passwordreset/reset/v1
pub async fn password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetConfirm>,
) -> Result<Json<Empty>, AppError> {
    let identity = state.identity();
    blocking(move || identity.reset_password(&req.reset_code, &req.new_password)).await?;
    Ok(Json(Empty {}))
}
