//! Notification feed
//!
//! Notifications are never stored. Each read merges the recipient's
//! provenance events with a scan for `@handle` mentions in the
//! conversations they currently belong to, ordered by the graph-wide
//! sequence number.

use std::sync::Arc;

use crate::data::{ChannelId, Conversation, DmId, Graph, ProvenanceKind, Store, User, UserId};
use crate::error::Result;
use crate::service::message::conversations_of;

/// Most entries returned by one read
pub const NOTIFICATION_LIMIT: usize = 20;

/// Characters of a tagging message quoted in its notification
const MENTION_EXCERPT_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub channel_id: Option<ChannelId>,
    pub dm_id: Option<DmId>,
    pub notification_message: String,
}

impl Notification {
    fn new(conversation: Conversation, notification_message: String) -> Self {
        Self {
            channel_id: conversation.channel_id(),
            dm_id: conversation.dm_id(),
            notification_message,
        }
    }
}

pub struct NotificationService {
    store: Arc<Store>,
}

impl NotificationService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// The actor's newest notifications, most recent first
    pub fn notifications_for(&self, actor: UserId) -> Result<Vec<Notification>> {
        let graph = self.store.read();
        let user = graph.actor(actor)?;

        let mut entries: Vec<(u64, Notification)> = graph
            .provenance()
            .events_for(actor)
            .take(NOTIFICATION_LIMIT)
            .filter_map(|event| render_event(&graph, user, &event.kind).map(|n| (event.seq, n)))
            .collect();
        entries.extend(mentions(&graph, user));

        entries.sort_by(|a, b| b.0.cmp(&a.0));
        entries.truncate(NOTIFICATION_LIMIT);
        Ok(entries.into_iter().map(|(_, notification)| notification).collect())
    }
}

fn handle_of(graph: &Graph, id: UserId) -> String {
    graph
        .user(id)
        .map(|user| user.display_handle().to_string())
        .unwrap_or_default()
}

fn render_event(graph: &Graph, recipient: &User, kind: &ProvenanceKind) -> Option<Notification> {
    let (conversation, text) = match *kind {
        ProvenanceKind::AddedToChannel { channel, by } => {
            let conversation = Conversation::Channel(channel);
            let text = format!(
                "{} added you to {}",
                handle_of(graph, by),
                graph.conversation_name(conversation)
            );
            (conversation, text)
        }
        ProvenanceKind::AddedToDm { dm, by } => {
            let conversation = Conversation::Dm(dm);
            let text = format!(
                "{} added you to {}",
                handle_of(graph, by),
                graph.conversation_name(conversation)
            );
            (conversation, text)
        }
        // Addressed to the joiner, so the handle is their own.
        ProvenanceKind::JoinedChannel { channel } => {
            let conversation = Conversation::Channel(channel);
            let text = format!(
                "{} joined {}",
                recipient.display_handle(),
                graph.conversation_name(conversation)
            );
            (conversation, text)
        }
        ProvenanceKind::Reacted { message, by } => {
            let conversation = graph.message(message).ok()?.parent;
            let text = format!(
                "{} reacted to your message in {}",
                handle_of(graph, by),
                graph.conversation_name(conversation)
            );
            (conversation, text)
        }
    };
    Some(Notification::new(conversation, text))
}

/// Newest mentions of `user` in each conversation they belong to
fn mentions<'g>(graph: &'g Graph, user: &'g User) -> impl Iterator<Item = (u64, Notification)> + 'g {
    let tag = format!("@{}", user.handle);
    conversations_of(user).flat_map(move |conversation| {
        let name = graph.conversation_name(conversation);
        let tag = tag.clone();
        graph
            .conversation_messages(conversation)
            .into_iter()
            .rev()
            .filter(move |message| !message.is_redacted() && message.text().contains(&tag))
            .take(NOTIFICATION_LIMIT)
            .map(move |message| {
                let excerpt: String = message.text().chars().take(MENTION_EXCERPT_LEN).collect();
                let text = format!(
                    "{} tagged you in {}: {}",
                    handle_of(graph, message.sender),
                    name,
                    excerpt
                );
                (message.seq, Notification::new(conversation, text))
            })
    })
}
