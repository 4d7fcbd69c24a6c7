//! Admin endpoints
//!
//! Global permission changes and account removal. Both require the caller
//! to be a global owner; the service layer enforces it.

use axum::{extract::State, response::Json};

use super::dto::*;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;

/// DELETE /admin/user/remove/v1
///
/// Also ends every session of the removed user.
pub async fn remove_user(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<RemoveUserRequest>,
) -> Result<Json<Empty>, AppError> {
    state.identity().remove_user(user_id, req.u_id)?;
    state.sessions.revoke_user(req.u_id);
    Ok(Json(Empty {}))
}

/// POST /admin/userpermission/change/v1
pub async fn change_permission(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<ChangePermissionRequest>,
) -> Result<Json<Empty>, AppError> {
    state
        .identity()
        .change_permission(user_id, req.u_id, req.permission_id)?;
    Ok(Json(Empty {}))
}
