//! Notifications, search and reset

use axum::{
    extract::{Query, State},
    response::Json,
};

use super::dto::*;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;

/// GET /notifications/get/v1
pub async fn notifications(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<NotificationsResponse>, AppError> {
    let notifications = state
        .notifications()
        .notifications_for(user_id)?
        .into_iter()
        .map(NotificationBody::from)
        .collect();
    Ok(Json(NotificationsResponse { notifications }))
}

/// GET /search/v2
pub async fn search(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let messages = state.messages().search(user_id, &query.query_str)?;
    Ok(Json(SearchResponse { messages }))
}

/// DELETE /clear/v1
///
/// Drops every user, conversation, message and session.
pub async fn clear(State(state): State<AppState>) -> Result<Json<Empty>, AppError> {
    state.store.clear();
    state.sessions.clear();
    crate::metrics::observe_graph(&state.store.read());

    tracing::warn!("Graph cleared");
    Ok(Json(Empty {}))
}
