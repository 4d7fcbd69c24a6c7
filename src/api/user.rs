//! User and users endpoints

use axum::{
    extract::{Query, State},
    response::Json,
};

use super::dto::*;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::storage::CropBox;

// =============================================================================
// Profile
// =============================================================================

/// GET /user/profile/v2
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = state.identity().profile(user_id, query.u_id)?;
    Ok(Json(ProfileResponse { user }))
}

/// PUT /user/profile/setname/v2
pub async fn set_name(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<SetNameRequest>,
) -> Result<Json<Empty>, AppError> {
    state
        .identity()
        .set_name(user_id, req.name_first, req.name_last)?;
    Ok(Json(Empty {}))
}

/// PUT /user/profile/setemail/v2
pub async fn set_email(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<SetEmailRequest>,
) -> Result<Json<Empty>, AppError> {
    state.identity().set_email(user_id, req.email)?;
    Ok(Json(Empty {}))
}

/// PUT /user/profile/sethandle/v1
pub async fn set_handle(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<SetHandleRequest>,
) -> Result<Json<Empty>, AppError> {
    state.identity().set_handle(user_id, req.handle_str)?;
    Ok(Json(Empty {}))
}

/// POST /user/profile/uploadphoto/v1
///
/// Fetches the image before touching the graph; the graph lock is only
/// taken to record the resulting URL.
pub async fn upload_photo(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<UploadPhotoRequest>,
) -> Result<Json<Empty>, AppError> {
    let identity = state.identity();
    // Fail fast for removed accounts before any network traffic.
    identity.profile(user_id, user_id)?;

    let crop = CropBox {
        x_start: req.x_start,
        y_start: req.y_start,
        x_end: req.x_end,
        y_end: req.y_end,
    };
    let url = state
        .media
        .store_profile_image(user_id, &req.img_url, crop)
        .await?;

    identity.set_profile_image(user_id, url)?;
    Ok(Json(Empty {}))
}

// =============================================================================
// Statistics
// =============================================================================

/// GET /user/stats/v1
pub async fn stats(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserStatsResponse>, AppError> {
    let stats = state.stats().user_stats(user_id)?;
    Ok(Json(UserStatsResponse {
        user_stats: (&stats).into(),
    }))
}

// =============================================================================
// Users
// =============================================================================

/// GET /users/all/v1
pub async fn all(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UsersResponse>, AppError> {
    let users = state.identity().users_all(user_id)?;
    Ok(Json(UsersResponse { users }))
}

/// GET /users/stats/v1
pub async fn platform_stats(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<PlatformStatsResponse>, AppError> {
    let stats = state.stats().platform_stats(user_id)?;
    Ok(Json(PlatformStatsResponse {
        dreams_stats: (&stats).into(),
    }))
}
