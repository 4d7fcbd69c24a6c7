//! DM endpoints

use axum::{
    extract::{Query, State},
    response::Json,
};

use super::dto::*;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::Conversation;
use crate::error::AppError;
use crate::service::DmDetails;

/// POST /dm/create/v1
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CreateDmRequest>,
) -> Result<Json<CreateDmResponse>, AppError> {
    let membership = state.membership();
    let dm_id = membership.create_dm(user_id, &req.u_ids)?;
    let dm_name = membership.dm_details(user_id, dm_id)?.name;
    Ok(Json(CreateDmResponse { dm_id, dm_name }))
}

/// GET /dm/list/v1
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<DmsResponse>, AppError> {
    let dms = state.membership().list_dms(user_id)?;
    Ok(Json(DmsResponse { dms }))
}

/// GET /dm/details/v1
pub async fn details(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<DmQuery>,
) -> Result<Json<DmDetails>, AppError> {
    Ok(Json(state.membership().dm_details(user_id, query.dm_id)?))
}

/// GET /dm/messages/v1
pub async fn messages(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<DmMessagesQuery>,
) -> Result<Json<MessagesResponse>, AppError> {
    let page = state
        .messages()
        .messages(user_id, Conversation::Dm(query.dm_id), query.start)?;
    Ok(Json(page.into()))
}

/// POST /dm/invite/v1
pub async fn invite(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<DmMemberRequest>,
) -> Result<Json<Empty>, AppError> {
    state.membership().invite_dm(user_id, req.dm_id, req.u_id)?;
    Ok(Json(Empty {}))
}

/// POST /dm/leave/v1
pub async fn leave(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<DmRequest>,
) -> Result<Json<Empty>, AppError> {
    state.membership().leave_dm(user_id, req.dm_id)?;
    Ok(Json(Empty {}))
}

/// DELETE /dm/remove/v1
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<DmRequest>,
) -> Result<Json<Empty>, AppError> {
    state.membership().remove_dm(user_id, req.dm_id)?;
    Ok(Json(Empty {}))
}
