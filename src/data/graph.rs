//! Social graph aggregate root
//!
//! `Graph` owns every user, channel, DM and message plus the id counters.
//! Membership is stored twice (member lists on the conversation, backlinks
//! on the user); the `link_*`/`unlink_*` helpers are the only code that
//! touches either side, and they always update both.
//!
//! The per-conversation message index is derived and skipped on
//! serialization; call [`Graph::rebuild_index`] after restoring a snapshot.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::models::*;
use super::provenance::{ProvenanceKind, ProvenanceLog};
use crate::error::{AppError, Result};

/// Monotonic id sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counters {
    next_message_id: u64,
    next_shared_message_id: u64,
    next_seq: u64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            next_message_id: 1,
            next_shared_message_id: 1,
            next_seq: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    users: Vec<User>,
    channels: Vec<Channel>,
    dms: Vec<Dm>,
    /// Sorted by id
    messages: Vec<Message>,
    counters: Counters,
    provenance: ProvenanceLog,
    platform_stats: Option<PlatformStats>,
    #[serde(skip)]
    index: HashMap<Conversation, Vec<MessageId>>,
    /// Bumped each time the store swaps in a new graph
    #[serde(skip)]
    generation: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifies this graph instance within one store
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Any user ever registered, removed ones included
    pub fn user(&self, id: UserId) -> Result<&User> {
        index_of(id.0, self.users.len())
            .map(|i| &self.users[i])
            .ok_or_else(|| AppError::validation(format!("u_id {id} does not refer to a valid user")))
    }

    /// A user that can still be invited, promoted or removed
    pub fn active_user(&self, id: UserId) -> Result<&User> {
        match self.user(id) {
            Ok(user) if !user.is_removed() => Ok(user),
            _ => Err(AppError::validation(format!(
                "u_id {id} does not refer to a valid user"
            ))),
        }
    }

    /// The user performing an operation
    ///
    /// Fails with an authorization error rather than a validation error:
    /// an actor that cannot be resolved has no authority at all.
    pub fn actor(&self, id: UserId) -> Result<&User> {
        match self.user(id) {
            Ok(user) if !user.is_removed() => Ok(user),
            _ => Err(AppError::authorization("Invalid token")),
        }
    }

    pub(crate) fn user_mut(&mut self, id: UserId) -> Result<&mut User> {
        let len = self.users.len();
        index_of(id.0, len)
            .map(|i| &mut self.users[i])
            .ok_or_else(|| AppError::validation(format!("u_id {id} does not refer to a valid user")))
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|user| !user.is_removed() && user.email == email)
    }

    pub fn user_by_reset_code(&self, code: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|user| !user.is_removed() && user.reset_code.as_deref() == Some(code))
    }

    pub fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .iter()
            .any(|user| Some(user.id) != except && !user.is_removed() && user.email == email)
    }

    pub fn handle_taken(&self, handle: &str, except: Option<UserId>) -> bool {
        self.users
            .iter()
            .any(|user| Some(user.id) != except && !user.is_removed() && user.handle == handle)
    }

    pub fn owner_count(&self) -> usize {
        self.users
            .iter()
            .filter(|user| !user.is_removed() && user.is_owner())
            .count()
    }

    pub(crate) fn push_user(&mut self, build: impl FnOnce(UserId) -> User) -> UserId {
        let id = UserId(self.users.len() as u64 + 1);
        self.users.push(build(id));
        id
    }

    // =========================================================================
    // Channels
    // =========================================================================

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// A live channel
    pub fn channel(&self, id: ChannelId) -> Result<&Channel> {
        index_of(id.0, self.channels.len())
            .map(|i| &self.channels[i])
            .filter(|channel| channel.is_live())
            .ok_or_else(|| {
                AppError::validation(format!("channel_id {id} does not refer to a valid channel"))
            })
    }

    pub(crate) fn channel_mut(&mut self, id: ChannelId) -> Result<&mut Channel> {
        let len = self.channels.len();
        index_of(id.0, len)
            .map(|i| &mut self.channels[i])
            .filter(|channel| channel.is_live())
            .ok_or_else(|| {
                AppError::validation(format!("channel_id {id} does not refer to a valid channel"))
            })
    }

    pub(crate) fn push_channel(&mut self, build: impl FnOnce(ChannelId) -> Channel) -> ChannelId {
        let id = ChannelId(self.channels.len() as u64 + 1);
        self.channels.push(build(id));
        id
    }

    // =========================================================================
    // DMs
    // =========================================================================

    pub fn dms(&self) -> &[Dm] {
        &self.dms
    }

    /// A live DM
    pub fn dm(&self, id: DmId) -> Result<&Dm> {
        index_of(id.0, self.dms.len())
            .map(|i| &self.dms[i])
            .filter(|dm| dm.is_live())
            .ok_or_else(|| AppError::validation(format!("dm_id {id} does not refer to a valid DM")))
    }

    pub(crate) fn dm_mut(&mut self, id: DmId) -> Result<&mut Dm> {
        let len = self.dms.len();
        index_of(id.0, len)
            .map(|i| &mut self.dms[i])
            .filter(|dm| dm.is_live())
            .ok_or_else(|| AppError::validation(format!("dm_id {id} does not refer to a valid DM")))
    }

    pub(crate) fn push_dm(&mut self, build: impl FnOnce(DmId) -> Dm) -> DmId {
        let id = DmId(self.dms.len() as u64 + 1);
        self.dms.push(build(id));
        id
    }

    /// Resolve a conversation, failing the same way `channel`/`dm` do
    pub fn ensure_conversation(&self, conversation: Conversation) -> Result<()> {
        match conversation {
            Conversation::Channel(id) => self.channel(id).map(|_| ()),
            Conversation::Dm(id) => self.dm(id).map(|_| ()),
        }
    }

    /// Current display name; tombstones render their sentinel
    pub fn conversation_name(&self, conversation: Conversation) -> String {
        let name = match conversation {
            Conversation::Channel(id) => index_of(id.0, self.channels.len())
                .map(|i| self.channels[i].display_name().to_string()),
            Conversation::Dm(id) => {
                index_of(id.0, self.dms.len()).map(|i| self.dms[i].display_name().to_string())
            }
        };
        name.unwrap_or_default()
    }

    pub fn conversation_members(&self, conversation: Conversation) -> &[UserId] {
        match conversation {
            Conversation::Channel(id) => self
                .channel(id)
                .map(|channel| channel.members.as_slice())
                .unwrap_or(&[]),
            Conversation::Dm(id) => self.dm(id).map(|dm| dm.members.as_slice()).unwrap_or(&[]),
        }
    }

    // =========================================================================
    // Membership links
    // =========================================================================

    /// Add `user` to the channel's member list and the channel to the user's backlinks
    pub(crate) fn link_channel_member(&mut self, channel: ChannelId, user: UserId) -> Result<()> {
        let record = self.channel_mut(channel)?;
        if !record.members.contains(&user) {
            record.members.push(user);
        }
        self.user_mut(user)?.channels.insert(channel);
        Ok(())
    }

    pub(crate) fn grant_channel_owner(&mut self, channel: ChannelId, user: UserId) -> Result<()> {
        let record = self.channel_mut(channel)?;
        if !record.owners.contains(&user) {
            record.owners.push(user);
        }
        Ok(())
    }

    pub(crate) fn revoke_channel_owner(&mut self, channel: ChannelId, user: UserId) -> Result<()> {
        self.channel_mut(channel)?.owners.retain(|id| *id != user);
        Ok(())
    }

    /// Remove `user` from members and owners on both sides
    ///
    /// Returns `true` when the channel lost its last member and was tombstoned.
    pub(crate) fn unlink_channel_member(&mut self, channel: ChannelId, user: UserId) -> Result<bool> {
        let record = self.channel_mut(channel)?;
        record.members.retain(|id| *id != user);
        record.owners.retain(|id| *id != user);
        let emptied = record.members.is_empty();
        if emptied {
            record.lifecycle = Lifecycle::Tombstoned;
        }
        self.user_mut(user)?.channels.remove(&channel);
        Ok(emptied)
    }

    pub(crate) fn link_dm_member(&mut self, dm: DmId, user: UserId) -> Result<()> {
        let record = self.dm_mut(dm)?;
        if !record.members.contains(&user) {
            record.members.push(user);
        }
        self.user_mut(user)?.dms.insert(dm);
        self.recompute_dm_name(dm)
    }

    pub(crate) fn unlink_dm_member(&mut self, dm: DmId, user: UserId) -> Result<()> {
        self.dm_mut(dm)?.members.retain(|id| *id != user);
        self.user_mut(user)?.dms.remove(&dm);
        self.recompute_dm_name(dm)
    }

    /// Sorted member handles joined by ", "
    pub(crate) fn recompute_dm_name(&mut self, dm: DmId) -> Result<()> {
        let mut handles: Vec<String> = self
            .dm(dm)?
            .members
            .iter()
            .filter_map(|id| self.user(*id).ok())
            .map(|user| user.handle.clone())
            .collect();
        handles.sort();
        self.dm_mut(dm)?.name = handles.join(", ");
        Ok(())
    }

    /// Clear every member of a DM and mark it removed
    pub(crate) fn tombstone_dm(&mut self, dm: DmId) -> Result<()> {
        let members = std::mem::take(&mut self.dm_mut(dm)?.members);
        for member in members {
            self.user_mut(member)?.dms.remove(&dm);
        }
        self.dm_mut(dm)?.lifecycle = Lifecycle::Tombstoned;
        Ok(())
    }

    // =========================================================================
    // Messages
    // =========================================================================

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: MessageId) -> Result<&Message> {
        self.messages
            .binary_search_by_key(&id, |message| message.id)
            .map(|i| &self.messages[i])
            .map_err(|_| {
                AppError::validation(format!("message_id {id} does not refer to a valid message"))
            })
    }

    pub fn has_message(&self, id: MessageId) -> bool {
        self.messages
            .binary_search_by_key(&id, |message| message.id)
            .is_ok()
    }

    pub(crate) fn message_mut(&mut self, id: MessageId) -> Result<&mut Message> {
        match self.messages.binary_search_by_key(&id, |message| message.id) {
            Ok(i) => Ok(&mut self.messages[i]),
            Err(_) => Err(AppError::validation(format!(
                "message_id {id} does not refer to a valid message"
            ))),
        }
    }

    pub(crate) fn reserve_message_id(&mut self) -> MessageId {
        let id = MessageId(self.counters.next_message_id);
        self.counters.next_message_id += 1;
        id
    }

    pub(crate) fn reserve_shared_id(&mut self) -> SharedMessageId {
        let id = SharedMessageId(self.counters.next_shared_message_id);
        self.counters.next_shared_message_id += 1;
        id
    }

    /// Next position in the graph-wide event order
    pub(crate) fn next_seq(&mut self) -> u64 {
        let seq = self.counters.next_seq;
        self.counters.next_seq += 1;
        seq
    }

    /// Insert a message at its id position
    ///
    /// Ids are normally appended in order; a scheduled send lands at the
    /// position of the id it reserved earlier.
    pub(crate) fn insert_message(&mut self, message: Message) {
        let id = message.id;
        let parent = message.parent;
        let at = self.messages.partition_point(|existing| existing.id < id);
        self.messages.insert(at, message);

        let ids = self.index.entry(parent).or_default();
        let at = ids.partition_point(|existing| *existing < id);
        ids.insert(at, id);
    }

    /// Messages of one conversation, oldest first
    pub fn conversation_messages(&self, conversation: Conversation) -> Vec<&Message> {
        self.index
            .get(&conversation)
            .map(|ids| ids.iter().filter_map(|id| self.message(*id).ok()).collect())
            .unwrap_or_default()
    }

    /// Redact every message of a conversation
    pub(crate) fn redact_conversation(&mut self, conversation: Conversation, reason: Redaction) {
        for message in self
            .messages
            .iter_mut()
            .filter(|message| message.parent == conversation)
        {
            message.redact(reason);
        }
    }

    pub(crate) fn redact_sender(&mut self, sender: UserId) {
        for message in self
            .messages
            .iter_mut()
            .filter(|message| message.sender == sender)
        {
            message.redact(Redaction::SenderRemoved);
        }
    }

    /// Rebuild the derived per-conversation index from the ledger
    pub fn rebuild_index(&mut self) {
        self.messages.sort_by_key(|message| message.id);
        self.index.clear();
        for message in &self.messages {
            self.index.entry(message.parent).or_default().push(message.id);
        }
    }

    // =========================================================================
    // Provenance and statistics
    // =========================================================================

    pub fn provenance(&self) -> &ProvenanceLog {
        &self.provenance
    }

    pub(crate) fn record_provenance(&mut self, recipient: UserId, kind: ProvenanceKind) {
        let seq = self.next_seq();
        self.provenance.record(recipient, seq, kind);
    }

    pub(crate) fn platform_stats_mut(&mut self) -> &mut PlatformStats {
        self.platform_stats.get_or_insert_with(PlatformStats::default)
    }

    pub fn active_user_count(&self) -> usize {
        self.users.iter().filter(|user| !user.is_removed()).count()
    }

    pub fn live_channel_count(&self) -> usize {
        self.channels.iter().filter(|channel| channel.is_live()).count()
    }

    pub fn live_dm_count(&self) -> usize {
        self.dms.iter().filter(|dm| dm.is_live()).count()
    }

    /// Messages that still carry their own text
    pub fn live_message_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| !message.is_redacted())
            .count()
    }

    pub(crate) fn now() -> i64 {
        Utc::now().timestamp()
    }
}

/// Map a 1-based id onto a vector index
fn index_of(id: u64, len: usize) -> Option<usize> {
    let index = usize::try_from(id).ok()?.checked_sub(1)?;
    (index < len).then_some(index)
}
