//! Data models
//!
//! Plain records making up the social graph. Everything here serializes
//! verbatim into a snapshot; nothing derived lives in these structs except
//! the cached statistics series, which are themselves append-only history.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// User id, assigned in registration order starting at 1
    UserId
);
entity_id!(
    /// Channel id, assigned in creation order starting at 1
    ChannelId
);
entity_id!(
    /// DM id, assigned in creation order starting at 1
    DmId
);
entity_id!(
    /// Message id, drawn from one counter shared by channels and DMs
    MessageId
);
entity_id!(
    /// Id handed back by `share`, drawn from its own counter
    SharedMessageId
);

// =============================================================================
// Users
// =============================================================================

/// Platform-wide permission level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalPermission {
    Owner,
    Member,
}

impl GlobalPermission {
    /// Parse the wire permission id (1 = Owner, 2 = Member)
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Owner),
            2 => Some(Self::Member),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Self::Owner => 1,
            Self::Member => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }
}

/// Whether an account is still usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountState {
    Active,
    Removed,
}

/// Profile text shown in place of a removed user's fields and messages
pub const REMOVED_USER: &str = "Removed user";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub name_first: String,
    pub name_last: String,
    pub handle: String,
    pub permission: GlobalPermission,
    pub profile_img_url: Option<String>,
    pub reset_code: Option<String>,
    /// Backlinks; mirror the member lists of the channels themselves
    pub channels: BTreeSet<ChannelId>,
    pub dms: BTreeSet<DmId>,
    pub stats: Option<UserStats>,
    pub state: AccountState,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_removed(&self) -> bool {
        self.state == AccountState::Removed
    }

    pub fn is_owner(&self) -> bool {
        self.permission == GlobalPermission::Owner
    }

    /// Handle used when rendering text about this user
    pub fn display_handle(&self) -> &str {
        if self.is_removed() {
            REMOVED_USER
        } else {
            &self.handle
        }
    }
}

// =============================================================================
// Conversations
// =============================================================================

/// Whether a channel or DM is still in use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Active,
    Tombstoned,
}

pub const REMOVED_CHANNEL: &str = "This channel has been removed";
pub const REMOVED_DM: &str = "This dm has been removed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub is_public: bool,
    pub creator: UserId,
    /// Always a subset of `members`
    pub owners: Vec<UserId>,
    pub members: Vec<UserId>,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
}

impl Channel {
    pub fn is_live(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn display_name(&self) -> &str {
        match self.lifecycle {
            Lifecycle::Active => &self.name,
            Lifecycle::Tombstoned => REMOVED_CHANNEL,
        }
    }
}

/// Direct message group
///
/// `name` is derived from the member handles and is recomputed by the
/// graph on every membership change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dm {
    pub id: DmId,
    pub name: String,
    pub creator: UserId,
    pub members: Vec<UserId>,
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
}

impl Dm {
    pub fn is_live(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn display_name(&self) -> &str {
        match self.lifecycle {
            Lifecycle::Active => &self.name,
            Lifecycle::Tombstoned => REMOVED_DM,
        }
    }
}

/// A channel or a DM; the parent of every message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conversation {
    Channel(ChannelId),
    Dm(DmId),
}

impl Conversation {
    pub fn channel_id(&self) -> Option<ChannelId> {
        match self {
            Self::Channel(id) => Some(*id),
            Self::Dm(_) => None,
        }
    }

    pub fn dm_id(&self) -> Option<DmId> {
        match self {
            Self::Channel(_) => None,
            Self::Dm(id) => Some(*id),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Channel(_) => "channel",
            Self::Dm(_) => "dm",
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// Longest message or search query accepted
pub const MAX_MESSAGE_LEN: usize = 1000;

/// The only react kind currently supported
pub const THUMBS_UP: u32 = 1;

/// Why a message's text was replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Redaction {
    Removed,
    ConversationRemoved,
    SenderRemoved,
}

impl Redaction {
    pub fn sentinel(&self) -> &'static str {
        match self {
            Self::Removed => "This message has been removed",
            Self::ConversationRemoved => REMOVED_DM,
            Self::SenderRemoved => REMOVED_USER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MessageBody {
    Active { text: String },
    Redacted { reason: Redaction },
}

/// Link from a shared message back to what it shared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRef {
    pub shared_id: SharedMessageId,
    pub original: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub react_id: u32,
    /// Each user appears at most once
    pub u_ids: Vec<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    /// Position in the graph-wide event order, shared with provenance events
    pub seq: u64,
    pub parent: Conversation,
    pub sender: UserId,
    pub body: MessageBody,
    /// Unix epoch seconds
    pub time_created: i64,
    pub reacts: Vec<Reaction>,
    pub is_pinned: bool,
    pub shared: Option<ShareRef>,
}

impl Message {
    /// Current text, or the redaction sentinel
    pub fn text(&self) -> &str {
        match &self.body {
            MessageBody::Active { text } => text,
            MessageBody::Redacted { reason } => reason.sentinel(),
        }
    }

    pub fn is_redacted(&self) -> bool {
        matches!(self.body, MessageBody::Redacted { .. })
    }

    /// Redaction is terminal: an already redacted message keeps its first reason.
    pub fn redact(&mut self, reason: Redaction) {
        if !self.is_redacted() {
            self.body = MessageBody::Redacted { reason };
        }
    }

    pub fn has_reacted(&self, react_id: u32, user: UserId) -> bool {
        self.reacts
            .iter()
            .any(|react| react.react_id == react_id && react.u_ids.contains(&user))
    }
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSample {
    pub count: u64,
    pub time_stamp: i64,
}

/// Time series that only grows when the observed count increases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatSeries(Vec<StatSample>);

impl StatSeries {
    /// Append a sample if this is the first observation or the count went up
    pub fn record(&mut self, count: u64, time_stamp: i64) {
        let increased = self.0.last().is_none_or(|last| count > last.count);
        if increased {
            self.0.push(StatSample { count, time_stamp });
        }
    }

    pub fn samples(&self) -> &[StatSample] {
        &self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub channels_joined: StatSeries,
    pub dms_joined: StatSeries,
    pub messages_sent: StatSeries,
    pub involvement_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub channels_exist: StatSeries,
    pub dms_exist: StatSeries,
    pub messages_exist: StatSeries,
    pub utilization_rate: f64,
}
