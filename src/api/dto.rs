//! Request and response bodies
//!
//! Field names follow the public Dreams wire format.

use serde::{Deserialize, Serialize};

use crate::data::{
    ChannelId, DmId, MessageId, PlatformStats, SharedMessageId, StatSeries, UserId, UserStats,
};
use crate::service::pagination::Page;
use crate::service::{MessageView, Notification, UserProfile};

/// Empty JSON object
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name_first: String,
    pub name_last: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub auth_user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub is_success: bool,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirm {
    pub reset_code: String,
    pub new_password: String,
}

// =============================================================================
// Channels
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
    pub is_public: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateChannelResponse {
    pub channel_id: ChannelId,
}

#[derive(Debug, Serialize)]
pub struct ChannelsResponse {
    pub channels: Vec<crate::service::ChannelSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelQuery {
    pub channel_id: ChannelId,
}

#[derive(Debug, Deserialize)]
pub struct ChannelMessagesQuery {
    pub channel_id: ChannelId,
    pub start: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChannelRequest {
    pub channel_id: ChannelId,
}

#[derive(Debug, Deserialize)]
pub struct ChannelMemberRequest {
    pub channel_id: ChannelId,
    pub u_id: UserId,
}

// =============================================================================
// DMs
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateDmRequest {
    pub u_ids: Vec<UserId>,
}

#[derive(Debug, Serialize)]
pub struct CreateDmResponse {
    pub dm_id: DmId,
    pub dm_name: String,
}

#[derive(Debug, Serialize)]
pub struct DmsResponse {
    pub dms: Vec<crate::service::DmSummary>,
}

#[derive(Debug, Deserialize)]
pub struct DmQuery {
    pub dm_id: DmId,
}

#[derive(Debug, Deserialize)]
pub struct DmMessagesQuery {
    pub dm_id: DmId,
    pub start: usize,
}

#[derive(Debug, Deserialize)]
pub struct DmRequest {
    pub dm_id: DmId,
}

#[derive(Debug, Deserialize)]
pub struct DmMemberRequest {
    pub dm_id: DmId,
    pub u_id: UserId,
}

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub channel_id: ChannelId,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SendDmRequest {
    pub dm_id: DmId,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SendLaterRequest {
    pub channel_id: ChannelId,
    pub message: String,
    /// Unix epoch seconds
    pub time_sent: i64,
}

#[derive(Debug, Deserialize)]
pub struct SendLaterDmRequest {
    pub dm_id: DmId,
    pub message: String,
    pub time_sent: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageIdResponse {
    pub message_id: MessageId,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub message_id: MessageId,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message_id: MessageId,
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub og_message_id: MessageId,
    #[serde(default)]
    pub message: String,
    /// -1 when sharing into a DM
    pub channel_id: i64,
    /// -1 when sharing into a channel
    pub dm_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub shared_message_id: SharedMessageId,
    pub message_id: MessageId,
}

#[derive(Debug, Deserialize)]
pub struct ReactRequest {
    pub message_id: MessageId,
    pub react_id: u32,
}

/// A page of messages; `end` is -1 once the oldest message is included
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageView>,
    pub start: usize,
    pub end: i64,
}

impl From<Page<MessageView>> for MessagesResponse {
    fn from(page: Page<MessageView>) -> Self {
        let end = page.end_marker();
        Self {
            messages: page.items,
            start: page.start,
            end,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query_str: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub messages: Vec<MessageView>,
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub u_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub struct SetNameRequest {
    pub name_first: String,
    pub name_last: String,
}

#[derive(Debug, Deserialize)]
pub struct SetEmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct SetHandleRequest {
    pub handle_str: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadPhotoRequest {
    pub img_url: String,
    pub x_start: i64,
    pub y_start: i64,
    pub x_end: i64,
    pub y_end: i64,
}

/// One sample of a statistics series, keyed by the series' count field
fn samples(series: &StatSeries, key: &str) -> Vec<serde_json::Value> {
    series
        .samples()
        .iter()
        .map(|sample| serde_json::json!({ key: sample.count, "time_stamp": sample.time_stamp }))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct UserStatsBody {
    pub channels_joined: Vec<serde_json::Value>,
    pub dms_joined: Vec<serde_json::Value>,
    pub messages_sent: Vec<serde_json::Value>,
    pub involvement_rate: f64,
}

impl From<&UserStats> for UserStatsBody {
    fn from(stats: &UserStats) -> Self {
        Self {
            channels_joined: samples(&stats.channels_joined, "num_channels_joined"),
            dms_joined: samples(&stats.dms_joined, "num_dms_joined"),
            messages_sent: samples(&stats.messages_sent, "num_messages_sent"),
            involvement_rate: stats.involvement_rate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserStatsResponse {
    pub user_stats: UserStatsBody,
}

#[derive(Debug, Serialize)]
pub struct PlatformStatsBody {
    pub channels_exist: Vec<serde_json::Value>,
    pub dms_exist: Vec<serde_json::Value>,
    pub messages_exist: Vec<serde_json::Value>,
    pub utilization_rate: f64,
}

impl From<&PlatformStats> for PlatformStatsBody {
    fn from(stats: &PlatformStats) -> Self {
        Self {
            channels_exist: samples(&stats.channels_exist, "num_channels_exist"),
            dms_exist: samples(&stats.dms_exist, "num_dms_exist"),
            messages_exist: samples(&stats.messages_exist, "num_messages_exist"),
            utilization_rate: stats.utilization_rate,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlatformStatsResponse {
    pub dreams_stats: PlatformStatsBody,
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RemoveUserRequest {
    pub u_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct ChangePermissionRequest {
    pub u_id: UserId,
    pub permission_id: i64,
}

// =============================================================================
// Notifications
// =============================================================================

#[derive(Debug, Serialize)]
pub struct NotificationBody {
    /// -1 for DM notifications
    pub channel_id: i64,
    /// -1 for channel notifications
    pub dm_id: i64,
    pub notification_message: String,
}

impl From<Notification> for NotificationBody {
    fn from(notification: Notification) -> Self {
        Self {
            channel_id: notification.channel_id.map_or(-1, |id| id.0 as i64),
            dm_id: notification.dm_id.map_or(-1, |id| id.0 as i64),
            notification_message: notification.notification_message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationBody>,
}
