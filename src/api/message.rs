//! Message endpoints

use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};

use super::dto::*;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{ChannelId, Conversation, DmId};
use crate::error::AppError;

// =============================================================================
// Sending
// =============================================================================

/// POST /message/send/v2
pub async fn send(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<SendRequest>,
) -> Result<Json<MessageIdResponse>, AppError> {
    let message_id =
        state
            .messages()
            .send(user_id, Conversation::Channel(req.channel_id), &req.message)?;
    Ok(Json(MessageIdResponse { message_id }))
}

/// POST /message/senddm/v1
pub async fn send_dm(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<SendDmRequest>,
) -> Result<Json<MessageIdResponse>, AppError> {
    let message_id = state
        .messages()
        .send(user_id, Conversation::Dm(req.dm_id), &req.message)?;
    Ok(Json(MessageIdResponse { message_id }))
}

fn delivery_time(time_sent: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::from_timestamp(time_sent, 0)
        .ok_or_else(|| AppError::validation(format!("time_sent {time_sent} is out of range")))
}

/// POST /message/sendlater/v1
pub async fn send_later(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<SendLaterRequest>,
) -> Result<Json<MessageIdResponse>, AppError> {
    let message_id = state.messages().send_later(
        user_id,
        Conversation::Channel(req.channel_id),
        &req.message,
        delivery_time(req.time_sent)?,
        state.timer.as_ref(),
    )?;
    Ok(Json(MessageIdResponse { message_id }))
}

/// POST /message/sendlaterdm/v1
pub async fn send_later_dm(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<SendLaterDmRequest>,
) -> Result<Json<MessageIdResponse>, AppError> {
    let message_id = state.messages().send_later(
        user_id,
        Conversation::Dm(req.dm_id),
        &req.message,
        delivery_time(req.time_sent)?,
        state.timer.as_ref(),
    )?;
    Ok(Json(MessageIdResponse { message_id }))
}

/// POST /message/share/v1
///
/// Exactly one of `channel_id` and `dm_id` must be other than -1.
pub async fn share(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<ShareRequest>,
) -> Result<Json<ShareResponse>, AppError> {
    let target = match (req.channel_id, req.dm_id) {
        (channel, -1) if channel >= 0 => Conversation::Channel(ChannelId(channel as u64)),
        (-1, dm) if dm >= 0 => Conversation::Dm(DmId(dm as u64)),
        _ => {
            return Err(AppError::validation(
                "Exactly one of channel_id and dm_id must be -1",
            ));
        }
    };

    let receipt = state
        .messages()
        .share(user_id, req.og_message_id, &req.message, target)?;
    Ok(Json(ShareResponse {
        shared_message_id: receipt.shared_message_id,
        message_id: receipt.message_id,
    }))
}

// =============================================================================
// Editing
// =============================================================================

/// PUT /message/edit/v2
pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<EditRequest>,
) -> Result<Json<Empty>, AppError> {
    state.messages().edit(user_id, req.message_id, &req.message)?;
    Ok(Json(Empty {}))
}

/// DELETE /message/remove/v1
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<MessageRequest>,
) -> Result<Json<Empty>, AppError> {
    state.messages().remove(user_id, req.message_id)?;
    Ok(Json(Empty {}))
}

// =============================================================================
// Reactions and pins
// =============================================================================

/// POST /message/react/v1
pub async fn react(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<ReactRequest>,
) -> Result<Json<Empty>, AppError> {
    state.messages().react(user_id, req.message_id, req.react_id)?;
    Ok(Json(Empty {}))
}

/// POST /message/unreact/v1
pub async fn unreact(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<ReactRequest>,
) -> Result<Json<Empty>, AppError> {
    state
        .messages()
        .unreact(user_id, req.message_id, req.react_id)?;
    Ok(Json(Empty {}))
}

/// POST /message/pin/v1
pub async fn pin(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<MessageRequest>,
) -> Result<Json<Empty>, AppError> {
    state.messages().pin(user_id, req.message_id)?;
    Ok(Json(Empty {}))
}

/// POST /message/unpin/v1
pub async fn unpin(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<MessageRequest>,
) -> Result<Json<Empty>, AppError> {
    state.messages().unpin(user_id, req.message_id)?;
    Ok(Json(Empty {}))
}
