//! Provenance log
//!
//! Records the membership and reaction events that notifications are
//! rendered from. Events are kept per recipient and trimmed to the newest
//! `retention` entries, so reading a user's notifications never walks the
//! whole history of the platform.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::models::{ChannelId, DmId, MessageId, UserId};

/// Notifications are capped at this many entries, so older events can
/// never surface and need not be retained.
pub const DEFAULT_RETENTION: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProvenanceKind {
    AddedToChannel { channel: ChannelId, by: UserId },
    JoinedChannel { channel: ChannelId },
    AddedToDm { dm: DmId, by: UserId },
    Reacted { message: MessageId, by: UserId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEvent {
    pub seq: u64,
    pub kind: ProvenanceKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceLog {
    #[serde(default = "default_retention")]
    retention: usize,
    events: BTreeMap<UserId, VecDeque<ProvenanceEvent>>,
}

fn default_retention() -> usize {
    DEFAULT_RETENTION
}

impl Default for ProvenanceLog {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }
}

impl ProvenanceLog {
    pub fn with_retention(retention: usize) -> Self {
        Self {
            retention: retention.max(1),
            events: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, recipient: UserId, seq: u64, kind: ProvenanceKind) {
        let queue = self.events.entry(recipient).or_default();
        queue.push_back(ProvenanceEvent { seq, kind });
        while queue.len() > self.retention {
            queue.pop_front();
        }
    }

    /// Events addressed to `recipient`, newest first
    pub fn events_for(&self, recipient: UserId) -> impl Iterator<Item = &ProvenanceEvent> {
        self.events
            .get(&recipient)
            .into_iter()
            .flat_map(|queue| queue.iter().rev())
    }
}
