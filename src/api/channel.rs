//! Channel endpoints

use axum::{
    extract::{Query, State},
    response::Json,
};

use super::dto::*;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::Conversation;
use crate::error::AppError;
use crate::service::ChannelDetails;

// =============================================================================
// Channels
// =============================================================================

/// POST /channels/create/v2
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CreateChannelRequest>,
) -> Result<Json<CreateChannelResponse>, AppError> {
    let channel_id = state
        .membership()
        .create_channel(user_id, &req.name, req.is_public)?;
    Ok(Json(CreateChannelResponse { channel_id }))
}

/// GET /channels/list/v2
pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ChannelsResponse>, AppError> {
    let channels = state.membership().list_channels(user_id)?;
    Ok(Json(ChannelsResponse { channels }))
}

/// GET /channels/listall/v2
pub async fn list_all(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ChannelsResponse>, AppError> {
    let channels = state.membership().list_all_channels(user_id)?;
    Ok(Json(ChannelsResponse { channels }))
}

// =============================================================================
// Channel
// =============================================================================

/// GET /channel/details/v2
pub async fn details(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ChannelQuery>,
) -> Result<Json<ChannelDetails>, AppError> {
    Ok(Json(
        state.membership().channel_details(user_id, query.channel_id)?,
    ))
}

/// GET /channel/messages/v2
pub async fn messages(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<ChannelMessagesQuery>,
) -> Result<Json<MessagesResponse>, AppError> {
    let page = state.messages().messages(
        user_id,
        Conversation::Channel(query.channel_id),
        query.start,
    )?;
    Ok(Json(page.into()))
}

/// POST /channel/invite/v2
pub async fn invite(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<ChannelMemberRequest>,
) -> Result<Json<Empty>, AppError> {
    state.membership().invite(user_id, req.channel_id, req.u_id)?;
    Ok(Json(Empty {}))
}

/// POST /channel/join/v2
pub async fn join(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<ChannelRequest>,
) -> Result<Json<Empty>, AppError> {
    state.membership().join(user_id, req.channel_id)?;
    Ok(Json(Empty {}))
}

/// POST /channel/addowner/v1
pub async fn add_owner(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<ChannelMemberRequest>,
) -> Result<Json<Empty>, AppError> {
    state.membership().add_owner(user_id, req.channel_id, req.u_id)?;
    Ok(Json(Empty {}))
}

/// POST /channel/removeowner/v1
pub async fn remove_owner(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<ChannelMemberRequest>,
) -> Result<Json<Empty>, AppError> {
    state
        .membership()
        .remove_owner(user_id, req.channel_id, req.u_id)?;
    Ok(Json(Empty {}))
}

/// POST /channel/leave/v1
pub async fn leave(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<ChannelRequest>,
) -> Result<Json<Empty>, AppError> {
    state.membership().leave(user_id, req.channel_id)?;
    Ok(Json(Empty {}))
}
