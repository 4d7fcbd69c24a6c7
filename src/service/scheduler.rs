//! Delayed message delivery
//!
//! `send_later` validates a message up front and reserves its id, then
//! hands a [`ScheduledSend`] to a [`DeliveryTimer`]. At fire time the
//! timer re-enters [`MessageService::deliver_scheduled`], which repeats the
//! membership checks under the graph lock exactly like a live send. A job
//! whose graph has since been cleared or restored is dropped.
//!
//! Accepted jobs cannot be cancelled and do not survive a restart.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::data::{Conversation, MessageId, Store, UserId};
use crate::service::MessageService;

/// A message waiting for its delivery time
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledSend {
    pub message_id: MessageId,
    pub sender: UserId,
    pub parent: Conversation,
    pub text: String,
    pub deliver_at: DateTime<Utc>,
    /// Graph generation the id was reserved in
    pub generation: u64,
}

/// Runs a job at or after its `deliver_at`
pub trait DeliveryTimer: Send + Sync {
    fn schedule(&self, job: ScheduledSend);
}

/// Timer backed by the tokio runtime
pub struct TokioTimer {
    store: Arc<Store>,
}

impl TokioTimer {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

impl DeliveryTimer for TokioTimer {
    fn schedule(&self, job: ScheduledSend) {
        let store = self.store.clone();
        tokio::spawn(async move {
            let delay = (job.deliver_at - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(delay).await;

            let message_id = job.message_id;
            match MessageService::new(store).deliver_scheduled(job) {
                Ok(_) => tracing::info!(message_id = %message_id, "Scheduled message delivered"),
                Err(error) => tracing::warn!(
                    message_id = %message_id,
                    %error,
                    "Scheduled message dropped"
                ),
            }
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Collects jobs so tests can fire them by hand
    #[derive(Default)]
    pub(crate) struct RecordingTimer {
        pub(crate) jobs: Mutex<Vec<ScheduledSend>>,
    }

    impl DeliveryTimer for RecordingTimer {
        fn schedule(&self, job: ScheduledSend) {
            self.jobs.lock().push(job);
        }
    }

    #[tokio::test]
    async fn tokio_timer_delivers_after_delay() {
        use crate::service::test_support::seed_users;
        use crate::service::MembershipService;

        let store = Arc::new(Store::default());
        let users = seed_users(&store, &["alice"]);
        let channel = MembershipService::new(store.clone())
            .create_channel(users[0], "general", true)
            .unwrap();

        let timer = TokioTimer::new(store.clone());
        let id = MessageService::new(store.clone())
            .send_later(
                users[0],
                Conversation::Channel(channel),
                "later",
                Utc::now() + chrono::Duration::milliseconds(50),
                &timer,
            )
            .unwrap();
        assert!(store.read().message(id).is_err());

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert_eq!(store.read().message(id).unwrap().text(), "later");
    }
}
