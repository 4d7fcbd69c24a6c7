//! Usage statistics
//!
//! Counts are recomputed from the ledgers on every call. The only state
//! kept is the sample history, which grows when a count goes up.

use std::sync::Arc;

use crate::data::{Graph, PlatformStats, Store, UserId, UserStats};
use crate::error::Result;

pub struct StatsService {
    store: Arc<Store>,
}

impl StatsService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// The actor's own participation history and involvement rate
    pub fn user_stats(&self, actor: UserId) -> Result<UserStats> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;

        let channels = user.channels.len() as u64;
        let dms = user.dms.len() as u64;
        let sent = graph
            .messages()
            .iter()
            .filter(|message| message.sender == actor)
            .count() as u64;
        let total = graph.live_channel_count() + graph.live_dm_count() + graph.live_message_count();
        let involvement = ((channels + dms + sent) as f64 / total.max(1) as f64).min(1.0);

        let now = Graph::now();
        let stats = graph.user_mut(actor)?.stats.get_or_insert_with(UserStats::default);
        stats.channels_joined.record(channels, now);
        stats.dms_joined.record(dms, now);
        stats.messages_sent.record(sent, now);
        stats.involvement_rate = involvement;
        Ok(stats.clone())
    }

    /// Platform-wide totals and utilization rate
    pub fn platform_stats(&self, actor: UserId) -> Result<PlatformStats> {
        let mut graph = self.store.write();
        let user_count = graph.actor(actor).map(|_| graph.active_user_count())?;

        let engaged = graph
            .users()
            .iter()
            .filter(|user| !user.is_removed())
            .filter(|user| !user.channels.is_empty() || !user.dms.is_empty())
            .count();
        let utilization = if user_count == 0 {
            0.0
        } else {
            engaged as f64 / user_count as f64
        };
        let channels = graph.live_channel_count() as u64;
        let dms = graph.live_dm_count() as u64;
        let messages = graph.live_message_count() as u64;

        let now = Graph::now();
        let stats = graph.platform_stats_mut();
        stats.channels_exist.record(channels, now);
        stats.dms_exist.record(dms, now);
        stats.messages_exist.record(messages, now);
        stats.utilization_rate = utilization;
        Ok(stats.clone())
    }
}
