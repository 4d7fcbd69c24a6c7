//! API layer
//!
//! HTTP handlers for:
//! - Auth and sessions
//! - Channels, DMs and messages
//! - Users, statistics and admin
//! - Metrics (Prometheus)
//!
//! Handlers only translate between the wire format and the services.

mod admin;
mod auth;
mod channel;
mod dm;
mod dto;
mod message;
pub mod metrics;
mod other;
mod user;

pub use dto::*;
pub use metrics::metrics_router;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::AppState;
use crate::error::AppError;

/// Run CPU-heavy service work (password hashing) off the async runtime
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

/// Create the Dreams router
///
/// Every route except registration, login and password reset requires a
/// bearer token.
pub fn dreams_router() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/register/v2", post(auth::register))
        .route("/auth/login/v2", post(auth::login))
        .route("/auth/logout/v1", post(auth::logout))
        .route(
            "/auth/passwordreset/request/v1",
            post(auth::password_reset_request),
        )
        .route("/auth/passwordreset/reset/v1", post(auth::password_reset))
        // Channels
        .route("/channels/create/v2", post(channel::create))
        .route("/channels/list/v2", get(channel::list))
        .route("/channels/listall/v2", get(channel::list_all))
        .route("/channel/details/v2", get(channel::details))
        .route("/channel/messages/v2", get(channel::messages))
        .route("/channel/invite/v2", post(channel::invite))
        .route("/channel/join/v2", post(channel::join))
        .route("/channel/addowner/v1", post(channel::add_owner))
        .route("/channel/removeowner/v1", post(channel::remove_owner))
        .route("/channel/leave/v1", post(channel::leave))
        // DMs
        .route("/dm/create/v1", post(dm::create))
        .route("/dm/list/v1", get(dm::list))
        .route("/dm/details/v1", get(dm::details))
        .route("/dm/messages/v1", get(dm::messages))
        .route("/dm/invite/v1", post(dm::invite))
        .route("/dm/leave/v1", post(dm::leave))
        .route("/dm/remove/v1", delete(dm::remove))
        // Messages
        .route("/message/send/v2", post(message::send))
        .route("/message/senddm/v1", post(message::send_dm))
        .route("/message/sendlater/v1", post(message::send_later))
        .route("/message/sendlaterdm/v1", post(message::send_later_dm))
        .route("/message/share/v1", post(message::share))
        .route("/message/edit/v2", put(message::edit))
        .route("/message/remove/v1", delete(message::remove))
        .route("/message/react/v1", post(message::react))
        .route("/message/unreact/v1", post(message::unreact))
        .route("/message/pin/v1", post(message::pin))
        .route("/message/unpin/v1", post(message::unpin))
        // Users
        .route("/user/profile/v2", get(user::profile))
        .route("/user/profile/setname/v2", put(user::set_name))
        .route("/user/profile/setemail/v2", put(user::set_email))
        .route("/user/profile/sethandle/v1", put(user::set_handle))
        .route("/user/profile/uploadphoto/v1", post(user::upload_photo))
        .route("/user/stats/v1", get(user::stats))
        .route("/users/all/v1", get(user::all))
        .route("/users/stats/v1", get(user::platform_stats))
        // Admin
        .route("/admin/user/remove/v1", delete(admin::remove_user))
        .route(
            "/admin/userpermission/change/v1",
            post(admin::change_permission),
        )
        // Other
        .route("/notifications/get/v1", get(other::notifications))
        .route("/search/v2", get(other::search))
}

/// Unauthenticated reset of all state, mounted only when
/// `server.enable_clear` is set
pub fn clear_router() -> Router<AppState> {
    Router::new().route("/clear/v1", delete(other::clear))
}
