//! Service layer
//!
//! Business rules of the platform, kept apart from the HTTP handlers.
//! Every service shares one [`Store`](crate::data::Store) and performs each
//! operation under a single acquisition of the graph lock.

pub mod authz;
mod identity;
mod membership;
mod message;
mod notification;
pub mod pagination;
pub mod scheduler;
mod stats;
#[cfg(test)]
mod test_support;

pub use identity::{IdentityService, NewUser, ProfilePatch, UserProfile};
pub use membership::{ChannelDetails, ChannelSummary, DmDetails, DmSummary, MembershipService};
pub use message::{MessageService, MessageView, ReactView, ShareReceipt};
pub use notification::{NOTIFICATION_LIMIT, Notification, NotificationService};
pub use scheduler::{DeliveryTimer, ScheduledSend, TokioTimer};
pub use stats::StatsService;
