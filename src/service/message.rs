//! Message service
//!
//! Sending, editing, removal, sharing, reactions and pins, plus the
//! paginated and searchable read views over the ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data::{
    Conversation, Graph, MAX_MESSAGE_LEN, Message, MessageBody, MessageId, ProvenanceKind,
    Reaction, Redaction, SharedMessageId, ShareRef, Store, THUMBS_UP, User, UserId,
};
use crate::error::{AppError, Result};
use crate::metrics::MESSAGES_TOTAL;
use crate::service::authz;
use crate::service::pagination::{PAGE_SIZE, Page, paginate};
use crate::service::scheduler::{DeliveryTimer, ScheduledSend};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactView {
    pub react_id: u32,
    pub u_ids: Vec<UserId>,
    pub is_this_user_reacted: bool,
}

/// A message as seen by one viewer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    pub message_id: MessageId,
    pub u_id: UserId,
    pub message: String,
    pub time_created: i64,
    pub reacts: Vec<ReactView>,
    pub is_pinned: bool,
}

impl MessageView {
    fn new(message: &Message, viewer: UserId) -> Self {
        Self {
            message_id: message.id,
            u_id: message.sender,
            message: message.text().to_string(),
            time_created: message.time_created,
            reacts: message
                .reacts
                .iter()
                .map(|react| ReactView {
                    react_id: react.react_id,
                    u_ids: react.u_ids.clone(),
                    is_this_user_reacted: react.u_ids.contains(&viewer),
                })
                .collect(),
            is_pinned: message.is_pinned,
        }
    }
}

/// Ids produced by a share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShareReceipt {
    pub shared_message_id: SharedMessageId,
    pub message_id: MessageId,
}

/// Message service
pub struct MessageService {
    store: Arc<Store>,
}

impl MessageService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    // =========================================================================
    // Posting
    // =========================================================================

    /// Post a message to a channel or DM
    pub fn send(&self, actor: UserId, parent: Conversation, text: &str) -> Result<MessageId> {
        let mut graph = self.store.write();
        check_postable(&graph, actor, parent, text)?;

        let id = graph.reserve_message_id();
        append(&mut graph, id, actor, parent, text.to_string(), None);
        MESSAGES_TOTAL.with_label_values(&[parent.kind()]).inc();

        tracing::info!(
            message_id = %id,
            user_id = %actor,
            conversation = ?parent,
            "Message sent"
        );
        Ok(id)
    }

    /// Validate a delayed send now and hand it to `timer`
    ///
    /// Returns the id the message will carry once delivered.
    pub fn send_later(
        &self,
        actor: UserId,
        parent: Conversation,
        text: &str,
        deliver_at: DateTime<Utc>,
        timer: &dyn DeliveryTimer,
    ) -> Result<MessageId> {
        let job = {
            let mut graph = self.store.write();
            check_postable(&graph, actor, parent, text)?;
            if deliver_at < Utc::now() {
                return Err(AppError::validation("time_sent is in the past"));
            }

            ScheduledSend {
                message_id: graph.reserve_message_id(),
                sender: actor,
                parent,
                text: text.to_string(),
                deliver_at,
                generation: graph.generation(),
            }
        };

        let id = job.message_id;
        tracing::info!(
            message_id = %id,
            user_id = %actor,
            deliver_at = %deliver_at,
            "Message scheduled"
        );
        timer.schedule(job);
        Ok(id)
    }

    /// Deliver a job accepted by `send_later` under its reserved id
    pub fn deliver_scheduled(&self, job: ScheduledSend) -> Result<MessageId> {
        let mut graph = self.store.write();
        if job.generation != graph.generation() || graph.has_message(job.message_id) {
            return Err(AppError::validation(format!(
                "message_id {} was reserved in a graph that has since been replaced",
                job.message_id
            )));
        }
        check_postable(&graph, job.sender, job.parent, &job.text)?;

        append(&mut graph, job.message_id, job.sender, job.parent, job.text, None);
        MESSAGES_TOTAL.with_label_values(&["scheduled"]).inc();
        Ok(job.message_id)
    }

    /// Re-post an existing message, with optional extra text, into `target`
    pub fn share(
        &self,
        actor: UserId,
        original: MessageId,
        extra: &str,
        target: Conversation,
    ) -> Result<ShareReceipt> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        if extra.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::validation(format!(
                "Message is longer than {MAX_MESSAGE_LEN} characters"
            )));
        }
        let original_text = graph.message(original)?.text().to_string();
        graph.ensure_conversation(target)?;
        if !authz::is_conversation_member(&graph, target, user) {
            return Err(AppError::authorization(
                "Can only share into a conversation you have joined",
            ));
        }

        let text = if extra.is_empty() {
            original_text
        } else {
            format!("{extra} {original_text}")
        };
        let shared_id = graph.reserve_shared_id();
        let message_id = graph.reserve_message_id();
        append(
            &mut graph,
            message_id,
            actor,
            target,
            text,
            Some(ShareRef {
                shared_id,
                original,
            }),
        );
        MESSAGES_TOTAL.with_label_values(&["share"]).inc();

        tracing::info!(
            message_id = %message_id,
            shared_message_id = %shared_id,
            original_id = %original,
            user_id = %actor,
            "Message shared"
        );
        Ok(ShareReceipt {
            shared_message_id: shared_id,
            message_id,
        })
    }

    // =========================================================================
    // Editing and removal
    // =========================================================================

    /// Replace a message's text; empty text removes it
    pub fn edit(&self, actor: UserId, message_id: MessageId, text: &str) -> Result<()> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        let message = graph.message(message_id)?;
        if message.is_redacted() {
            return Err(AppError::validation("Message has already been removed"));
        }
        if text.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::validation(format!(
                "Message is longer than {MAX_MESSAGE_LEN} characters"
            )));
        }
        if !authz::can_moderate(&graph, message, user) {
            return Err(AppError::authorization(
                "Only the sender or an owner can edit this message",
            ));
        }

        let message = graph.message_mut(message_id)?;
        if text.is_empty() {
            message.redact(Redaction::Removed);
            tracing::info!(message_id = %message_id, user_id = %actor, "Message removed by empty edit");
        } else {
            message.body = MessageBody::Active {
                text: text.to_string(),
            };
            tracing::info!(message_id = %message_id, user_id = %actor, "Message edited");
        }
        Ok(())
    }

    /// Redact a message, keeping its id, parent and timestamp
    pub fn remove(&self, actor: UserId, message_id: MessageId) -> Result<()> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        let message = graph.message(message_id)?;
        if message.is_redacted() {
            return Err(AppError::validation("Message has already been removed"));
        }
        if !authz::can_moderate(&graph, message, user) {
            return Err(AppError::authorization(
                "Only the sender or an owner can remove this message",
            ));
        }

        graph.message_mut(message_id)?.redact(Redaction::Removed);
        tracing::info!(message_id = %message_id, user_id = %actor, "Message removed");
        Ok(())
    }

    // =========================================================================
    // Reactions
    // =========================================================================

    pub fn react(&self, actor: UserId, message_id: MessageId, react_id: u32) -> Result<()> {
        let mut graph = self.store.write();
        let message = check_reactable(&graph, actor, message_id, react_id)?;
        if message.has_reacted(react_id, actor) {
            return Err(AppError::validation("Already reacted to this message"));
        }
        let sender = message.sender;

        let message = graph.message_mut(message_id)?;
        match message.reacts.iter_mut().find(|react| react.react_id == react_id) {
            Some(react) => react.u_ids.push(actor),
            None => message.reacts.push(Reaction {
                react_id,
                u_ids: vec![actor],
            }),
        }

        if sender != actor && graph.active_user(sender).is_ok() {
            graph.record_provenance(
                sender,
                ProvenanceKind::Reacted {
                    message: message_id,
                    by: actor,
                },
            );
        }

        tracing::debug!(message_id = %message_id, user_id = %actor, react_id, "Reacted");
        Ok(())
    }

    pub fn unreact(&self, actor: UserId, message_id: MessageId, react_id: u32) -> Result<()> {
        let mut graph = self.store.write();
        let message = check_reactable(&graph, actor, message_id, react_id)?;
        if !message.has_reacted(react_id, actor) {
            return Err(AppError::validation("Have not reacted to this message"));
        }

        // Emptied reaction entries are left in place.
        let message = graph.message_mut(message_id)?;
        for react in message
            .reacts
            .iter_mut()
            .filter(|react| react.react_id == react_id)
        {
            react.u_ids.retain(|id| *id != actor);
        }

        tracing::debug!(message_id = %message_id, user_id = %actor, react_id, "Unreacted");
        Ok(())
    }

    // =========================================================================
    // Pins
    // =========================================================================

    pub fn pin(&self, actor: UserId, message_id: MessageId) -> Result<()> {
        self.set_pinned(actor, message_id, true)
    }

    pub fn unpin(&self, actor: UserId, message_id: MessageId) -> Result<()> {
        self.set_pinned(actor, message_id, false)
    }

    fn set_pinned(&self, actor: UserId, message_id: MessageId, pinned: bool) -> Result<()> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        let message = graph.message(message_id)?;
        if message.is_pinned == pinned {
            return Err(AppError::validation(if pinned {
                "Message is already pinned"
            } else {
                "Message is not pinned"
            }));
        }
        if !authz::can_pin(&graph, message, user) {
            return Err(AppError::authorization(
                "Only owners of the conversation can pin messages",
            ));
        }

        graph.message_mut(message_id)?.is_pinned = pinned;
        tracing::info!(message_id = %message_id, user_id = %actor, pinned, "Pin state changed");
        Ok(())
    }

    // =========================================================================
    // Read views
    // =========================================================================

    /// One page of a conversation, newest first
    pub fn messages(
        &self,
        actor: UserId,
        conversation: Conversation,
        start: usize,
    ) -> Result<Page<MessageView>> {
        let graph = self.store.read();
        let user = graph.actor(actor)?;
        graph.ensure_conversation(conversation)?;
        if !authz::is_conversation_member(&graph, conversation, user) {
            return Err(AppError::authorization("Not a member of this conversation"));
        }

        let page = paginate(graph.conversation_messages(conversation), start, PAGE_SIZE)?;
        Ok(page.map(|message| MessageView::new(message, actor)))
    }

    /// Case-insensitive substring search over the actor's conversations
    pub fn search(&self, actor: UserId, query: &str) -> Result<Vec<MessageView>> {
        let graph = self.store.read();
        let user = graph.actor(actor)?;
        if query.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::validation(format!(
                "Query is longer than {MAX_MESSAGE_LEN} characters"
            )));
        }

        let needle = query.to_lowercase();
        let mut found: Vec<&Message> = conversations_of(user)
            .flat_map(|conversation| graph.conversation_messages(conversation))
            .filter(|message| !message.is_redacted())
            .filter(|message| message.text().to_lowercase().contains(&needle))
            .collect();
        found.sort_by(|a, b| b.id.cmp(&a.id));

        Ok(found
            .into_iter()
            .map(|message| MessageView::new(message, actor))
            .collect())
    }
}

/// Every conversation a user currently belongs to
pub(crate) fn conversations_of(user: &User) -> impl Iterator<Item = Conversation> + '_ {
    user.channels
        .iter()
        .map(|id| Conversation::Channel(*id))
        .chain(user.dms.iter().map(|id| Conversation::Dm(*id)))
}

/// Checks shared by live and scheduled sends
fn check_postable(graph: &Graph, actor: UserId, parent: Conversation, text: &str) -> Result<()> {
    let user = graph.actor(actor)?;
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::validation(format!(
            "Message is longer than {MAX_MESSAGE_LEN} characters"
        )));
    }
    graph.ensure_conversation(parent)?;
    if !authz::can_post(graph, parent, user) {
        return Err(AppError::authorization("Not a member of this conversation"));
    }
    Ok(())
}

/// Checks shared by react and unreact; redacted messages take no reactions
fn check_reactable<'g>(
    graph: &'g Graph,
    actor: UserId,
    message_id: MessageId,
    react_id: u32,
) -> Result<&'g Message> {
    let user = graph.actor(actor)?;
    if react_id != THUMBS_UP {
        return Err(AppError::validation(format!(
            "react_id {react_id} is not a valid react"
        )));
    }
    let message = graph.message(message_id)?;
    if !authz::is_conversation_member(graph, message.parent, user) {
        return Err(AppError::authorization("Not a member of this conversation"));
    }
    if message.is_redacted() {
        return Err(AppError::validation("Message has been removed"));
    }
    Ok(message)
}

fn append(
    graph: &mut Graph,
    id: MessageId,
    sender: UserId,
    parent: Conversation,
    text: String,
    shared: Option<ShareRef>,
) {
    let seq = graph.next_seq();
    graph.insert_message(Message {
        id,
        seq,
        parent,
        sender,
        body: MessageBody::Active { text },
        time_created: Graph::now(),
        reacts: Vec::new(),
        is_pinned: false,
        shared,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ChannelId, DmId};
    use crate::service::MembershipService;
    use crate::service::scheduler::tests::RecordingTimer;
    use crate::service::test_support::seed_users;

    struct Fixture {
        store: Arc<Store>,
        messages: MessageService,
        membership: MembershipService,
        users: Vec<UserId>,
    }

    fn fixture(handles: &[&str]) -> Fixture {
        let store = Arc::new(Store::default());
        let users = seed_users(&store, handles);
        Fixture {
            messages: MessageService::new(store.clone()),
            membership: MembershipService::new(store.clone()),
            store,
            users,
        }
    }

    fn texts(page: &Page<MessageView>) -> Vec<&str> {
        page.items.iter().map(|m| m.message.as_str()).collect()
    }

    #[test]
    fn remove_redacts_in_place() {
        let f = fixture(&["alice", "bob"]);
        let (a, b) = (f.users[0], f.users[1]);
        let channel = f.membership.create_channel(a, "general", true).unwrap();
        f.membership.invite(a, channel, b).unwrap();
        let parent = Conversation::Channel(channel);

        let ids: Vec<MessageId> = ["m1", "m2", "m3"]
            .iter()
            .map(|text| f.messages.send(b, parent, text).unwrap())
            .collect();
        let page = f.messages.messages(a, parent, 0).unwrap();
        assert_eq!(texts(&page), vec!["m3", "m2", "m1"]);
        assert_eq!(page.end, None);

        let before = f.store.read().message(ids[1]).unwrap().clone();
        f.messages.remove(a, ids[1]).unwrap();

        let page = f.messages.messages(a, parent, 0).unwrap();
        assert_eq!(
            texts(&page),
            vec!["m3", "This message has been removed", "m1"]
        );
        let after = f.store.read().message(ids[1]).unwrap().clone();
        assert_eq!(after.id, before.id);
        assert_eq!(after.parent, before.parent);
        assert_eq!(after.time_created, before.time_created);
        assert!(matches!(
            f.messages.remove(a, ids[1]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn ids_increase_across_channels_and_dms() {
        let f = fixture(&["alice", "bob"]);
        let (a, b) = (f.users[0], f.users[1]);
        let channel = f.membership.create_channel(a, "general", true).unwrap();
        let dm = f.membership.create_dm(a, &[b]).unwrap();

        let first = f.messages.send(a, Conversation::Channel(channel), "c").unwrap();
        let second = f.messages.send(b, Conversation::Dm(dm), "d").unwrap();
        let shared = f
            .messages
            .share(a, first, "", Conversation::Dm(dm))
            .unwrap();
        let third = f.messages.send(a, Conversation::Channel(channel), "e").unwrap();

        assert!(first < second && second < shared.message_id && shared.message_id < third);
        assert_eq!(shared.shared_message_id, SharedMessageId(1));
    }

    #[test]
    fn send_checks_length_then_membership() {
        let f = fixture(&["alice", "bob", "carol"]);
        let (owner, b, c) = (f.users[0], f.users[1], f.users[2]);
        let channel = f.membership.create_channel(b, "general", true).unwrap();
        let parent = Conversation::Channel(channel);

        assert!(matches!(
            f.messages.send(b, parent, &"x".repeat(1001)),
            Err(AppError::Validation(_))
        ));
        assert!(f.messages.send(b, parent, &"x".repeat(1000)).is_ok());
        assert!(matches!(
            f.messages.send(c, parent, "hi"),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            f.messages.send(b, Conversation::Channel(ChannelId(9)), "hi"),
            Err(AppError::Validation(_))
        ));
        // Global owners may post into channels they have not joined.
        assert!(f.messages.send(owner, parent, "hi").is_ok());
    }

    #[test]
    fn global_owner_bypass_does_not_cover_dms() {
        let f = fixture(&["alice", "bob", "carol"]);
        let (owner, b, c) = (f.users[0], f.users[1], f.users[2]);
        let dm = f.membership.create_dm(b, &[c]).unwrap();

        assert!(matches!(
            f.messages.send(owner, Conversation::Dm(dm), "hi"),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn edit_permissions_and_empty_edit() {
        let f = fixture(&["alice", "bob", "carol"]);
        let (a, b, c) = (f.users[0], f.users[1], f.users[2]);
        let channel = f.membership.create_channel(b, "general", true).unwrap();
        f.membership.join(c, channel).unwrap();
        let parent = Conversation::Channel(channel);
        let id = f.messages.send(c, parent, "hello").unwrap();
        let other = f.messages.send(b, parent, "owner post").unwrap();

        assert!(matches!(
            f.messages.edit(c, other, "hijack"),
            Err(AppError::Authorization(_))
        ));
        f.messages.edit(c, id, "hello again").unwrap();
        f.messages.edit(b, id, "moderated").unwrap();
        f.messages.edit(a, id, "by global owner").unwrap();
        assert_eq!(
            f.store.read().message(id).unwrap().text(),
            "by global owner"
        );

        f.messages.edit(c, id, "").unwrap();
        assert!(f.store.read().message(id).unwrap().is_redacted());
        assert!(matches!(
            f.messages.edit(c, id, "back"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn share_combines_text_and_requires_membership() {
        let f = fixture(&["alice", "bob", "carol"]);
        let (a, b, c) = (f.users[0], f.users[1], f.users[2]);
        let channel = f.membership.create_channel(a, "general", true).unwrap();
        let dm = f.membership.create_dm(b, &[c]).unwrap();
        let original = f
            .messages
            .send(a, Conversation::Channel(channel), "original")
            .unwrap();

        assert!(matches!(
            f.messages.share(a, original, "", Conversation::Dm(dm)),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            f.messages.share(b, MessageId(99), "", Conversation::Dm(dm)),
            Err(AppError::Validation(_))
        ));

        let first = f
            .messages
            .share(b, original, "look", Conversation::Dm(dm))
            .unwrap();
        let second = f
            .messages
            .share(c, original, "", Conversation::Dm(DmId(1)))
            .unwrap();

        let graph = f.store.read();
        assert_eq!(graph.message(first.message_id).unwrap().text(), "look original");
        assert_eq!(graph.message(second.message_id).unwrap().text(), "original");
        assert_eq!(first.shared_message_id, SharedMessageId(1));
        assert_eq!(second.shared_message_id, SharedMessageId(2));
        assert_eq!(
            graph.message(first.message_id).unwrap().shared.unwrap().original,
            original
        );
    }

    #[test]
    fn react_and_unreact_are_not_idempotent() {
        let f = fixture(&["alice", "bob"]);
        let (a, b) = (f.users[0], f.users[1]);
        let channel = f.membership.create_channel(a, "general", true).unwrap();
        f.membership.invite(a, channel, b).unwrap();
        let parent = Conversation::Channel(channel);
        let id = f.messages.send(b, parent, "react to me").unwrap();

        f.messages.react(a, id, THUMBS_UP).unwrap();
        let page = f.messages.messages(a, parent, 0).unwrap();
        assert_eq!(page.items[0].reacts[0].u_ids, vec![a]);
        assert!(page.items[0].reacts[0].is_this_user_reacted);
        let page = f.messages.messages(b, parent, 0).unwrap();
        assert!(!page.items[0].reacts[0].is_this_user_reacted);

        assert!(matches!(
            f.messages.react(a, id, THUMBS_UP),
            Err(AppError::Validation(_))
        ));
        f.messages.unreact(a, id, THUMBS_UP).unwrap();
        assert!(!f.store.read().message(id).unwrap().has_reacted(THUMBS_UP, a));
        assert!(matches!(
            f.messages.unreact(a, id, THUMBS_UP),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn react_rejects_bad_kind_outsiders_and_redacted_messages() {
        let f = fixture(&["alice", "bob", "carol"]);
        let (a, b, c) = (f.users[0], f.users[1], f.users[2]);
        let channel = f.membership.create_channel(b, "general", true).unwrap();
        let id = f.messages.send(b, Conversation::Channel(channel), "hi").unwrap();

        assert!(matches!(
            f.messages.react(b, id, 2),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            f.messages.react(c, id, THUMBS_UP),
            Err(AppError::Authorization(_))
        ));

        f.messages.remove(a, id).unwrap();
        assert!(matches!(
            f.messages.react(b, id, THUMBS_UP),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn pin_requires_owner_and_rejects_repeat() {
        let f = fixture(&["alice", "bob", "carol"]);
        let (b, c) = (f.users[1], f.users[2]);
        let channel = f.membership.create_channel(b, "general", true).unwrap();
        f.membership.join(c, channel).unwrap();
        let id = f.messages.send(c, Conversation::Channel(channel), "pin me").unwrap();

        assert!(matches!(f.messages.pin(c, id), Err(AppError::Authorization(_))));
        f.messages.pin(b, id).unwrap();
        assert!(matches!(f.messages.pin(b, id), Err(AppError::Validation(_))));
        f.messages.unpin(b, id).unwrap();
        assert!(matches!(f.messages.unpin(b, id), Err(AppError::Validation(_))));

        let dm = f.membership.create_dm(b, &[c]).unwrap();
        let dm_message = f.messages.send(c, Conversation::Dm(dm), "dm").unwrap();
        assert!(matches!(
            f.messages.pin(c, dm_message),
            Err(AppError::Authorization(_))
        ));
        f.messages.pin(b, dm_message).unwrap();
    }

    #[test]
    fn dm_removal_redacts_its_messages() {
        let f = fixture(&["alice", "bob"]);
        let (a, b) = (f.users[0], f.users[1]);
        let dm = f.membership.create_dm(a, &[b]).unwrap();
        let id = f.messages.send(b, Conversation::Dm(dm), "secret").unwrap();

        f.membership.remove_dm(a, dm).unwrap();
        assert_eq!(
            f.store.read().message(id).unwrap().text(),
            "This dm has been removed"
        );
        assert!(matches!(
            f.messages.send(a, Conversation::Dm(dm), "hello?"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn messages_checks_start_and_membership() {
        let f = fixture(&["alice", "bob", "carol"]);
        let (b, c) = (f.users[1], f.users[2]);
        let channel = f.membership.create_channel(b, "general", true).unwrap();
        let parent = Conversation::Channel(channel);
        f.messages.send(b, parent, "one").unwrap();

        assert!(matches!(
            f.messages.messages(c, parent, 0),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            f.messages.messages(b, parent, 2),
            Err(AppError::Validation(_))
        ));
        assert!(f.messages.messages(b, parent, 1).unwrap().items.is_empty());
    }

    #[test]
    fn search_is_case_insensitive_and_scoped_to_membership() {
        let f = fixture(&["alice", "bob", "carol"]);
        let (b, c) = (f.users[1], f.users[2]);
        let channel = f.membership.create_channel(b, "general", true).unwrap();
        let hidden = f.membership.create_channel(c, "hidden", true).unwrap();
        f.messages.send(b, Conversation::Channel(channel), "Hello World").unwrap();
        f.messages.send(b, Conversation::Channel(channel), "goodbye").unwrap();
        f.messages.send(c, Conversation::Channel(hidden), "hello from hidden").unwrap();

        let results = f.messages.search(b, "HELLO").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message, "Hello World");
        assert!(matches!(
            f.messages.search(b, &"q".repeat(1001)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn send_later_reserves_id_and_delivers_through_timer() {
        let f = fixture(&["alice", "bob"]);
        let (a, b) = (f.users[0], f.users[1]);
        let channel = f.membership.create_channel(a, "general", true).unwrap();
        let parent = Conversation::Channel(channel);
        let timer = RecordingTimer::default();
        let later = Utc::now() + chrono::Duration::seconds(60);

        assert!(matches!(
            f.messages
                .send_later(a, parent, "late", Utc::now() - chrono::Duration::seconds(5), &timer),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            f.messages.send_later(b, parent, "late", later, &timer),
            Err(AppError::Authorization(_))
        ));

        let reserved = f.messages.send_later(a, parent, "late", later, &timer).unwrap();
        let live = f.messages.send(a, parent, "now").unwrap();
        assert!(reserved < live);

        let job = timer.jobs.lock().pop().unwrap();
        assert_eq!(f.messages.deliver_scheduled(job).unwrap(), reserved);

        let page = f.messages.messages(a, parent, 0).unwrap();
        let ids: Vec<MessageId> = page.items.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![live, reserved]);
    }

    #[test]
    fn scheduled_delivery_rechecks_membership() {
        let f = fixture(&["alice", "bob"]);
        let (a, b) = (f.users[0], f.users[1]);
        let dm = f.membership.create_dm(a, &[b]).unwrap();
        let timer = RecordingTimer::default();
        let later = Utc::now() + chrono::Duration::seconds(60);

        f.messages
            .send_later(b, Conversation::Dm(dm), "bye", later, &timer)
            .unwrap();
        f.membership.leave_dm(b, dm).unwrap();

        let job = timer.jobs.lock().pop().unwrap();
        assert!(matches!(
            f.messages.deliver_scheduled(job),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn scheduled_delivery_is_dropped_after_clear() {
        let f = fixture(&["alice", "bob"]);
        let a = f.users[0];
        let channel = f.membership.create_channel(a, "general", true).unwrap();
        let timer = RecordingTimer::default();
        let later = Utc::now() + chrono::Duration::seconds(60);

        f.messages
            .send(a, Conversation::Channel(channel), "before")
            .unwrap();
        let reserved = f
            .messages
            .send_later(a, Conversation::Channel(channel), "stale", later, &timer)
            .unwrap();

        f.store.clear();
        let users = seed_users(&f.store, &["carol", "dave"]);
        let channel = f
            .membership
            .create_channel(users[0], "general", true)
            .unwrap();
        let first = f
            .messages
            .send(users[0], Conversation::Channel(channel), "fresh1")
            .unwrap();
        let second = f
            .messages
            .send(users[0], Conversation::Channel(channel), "fresh2")
            .unwrap();
        assert_eq!(second, reserved);

        let job = timer.jobs.lock().pop().unwrap();
        assert!(matches!(
            f.messages.deliver_scheduled(job),
            Err(AppError::Validation(_))
        ));

        let graph = f.store.read();
        let ids: Vec<MessageId> = graph.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert_eq!(graph.message(reserved).unwrap().text(), "fresh2");
    }

    #[test]
    fn scheduled_delivery_never_reuses_a_taken_id() {
        let f = fixture(&["alice"]);
        let a = f.users[0];
        let channel = f.membership.create_channel(a, "general", true).unwrap();
        let timer = RecordingTimer::default();
        let later = Utc::now() + chrono::Duration::seconds(60);

        f.messages
            .send_later(a, Conversation::Channel(channel), "once", later, &timer)
            .unwrap();
        let job = timer.jobs.lock().pop().unwrap();

        f.messages.deliver_scheduled(job.clone()).unwrap();
        assert!(matches!(
            f.messages.deliver_scheduled(job),
            Err(AppError::Validation(_))
        ));
        assert_eq!(f.store.read().messages().len(), 1);
    }
}
