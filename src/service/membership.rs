//! Membership service
//!
//! Channels and DMs: creation, invitations, ownership and leaving.
//! Every method runs under a single write (or read) guard, so the member
//! list of a conversation and the backlinks on its users never disagree.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::data::{
    Channel, ChannelId, Conversation, Dm, DmId, Lifecycle, ProvenanceKind, Redaction, Store,
    UserId,
};
use crate::error::{AppError, Result};
use crate::service::authz;
use crate::service::identity::UserProfile;

const MAX_CHANNEL_NAME_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub channel_id: ChannelId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelDetails {
    pub name: String,
    pub is_public: bool,
    pub owner_members: Vec<UserProfile>,
    pub all_members: Vec<UserProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DmSummary {
    pub dm_id: DmId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DmDetails {
    pub name: String,
    pub members: Vec<UserProfile>,
}

/// Membership service
pub struct MembershipService {
    store: Arc<Store>,
}

impl MembershipService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    // =========================================================================
    // Channels
    // =========================================================================

    /// Create a channel; the creator becomes its sole owner and member
    pub fn create_channel(&self, actor: UserId, name: &str, is_public: bool) -> Result<ChannelId> {
        let mut graph = self.store.write();
        graph.actor(actor)?;

        let len = name.chars().count();
        if !(1..=MAX_CHANNEL_NAME_LEN).contains(&len) {
            return Err(AppError::validation(format!(
                "Channel name must be between 1 and {MAX_CHANNEL_NAME_LEN} characters"
            )));
        }

        let channel_id = graph.push_channel(|id| Channel {
            id,
            name: name.to_string(),
            is_public,
            creator: actor,
            owners: Vec::new(),
            members: Vec::new(),
            lifecycle: Lifecycle::Active,
            created_at: Utc::now(),
        });
        graph.link_channel_member(channel_id, actor)?;
        graph.grant_channel_owner(channel_id, actor)?;
        crate::metrics::observe_graph(&graph);

        tracing::info!(
            channel_id = %channel_id,
            user_id = %actor,
            is_public,
            "Channel created"
        );
        Ok(channel_id)
    }

    /// Channels the actor belongs to
    pub fn list_channels(&self, actor: UserId) -> Result<Vec<ChannelSummary>> {
        let graph = self.store.read();
        let user = graph.actor(actor)?;
        Ok(user
            .channels
            .iter()
            .filter_map(|id| graph.channel(*id).ok())
            .map(|channel| ChannelSummary {
                channel_id: channel.id,
                name: channel.name.clone(),
            })
            .collect())
    }

    /// Every live channel, private ones included
    pub fn list_all_channels(&self, actor: UserId) -> Result<Vec<ChannelSummary>> {
        let graph = self.store.read();
        graph.actor(actor)?;
        Ok(graph
            .channels()
            .iter()
            .filter(|channel| channel.is_live())
            .map(|channel| ChannelSummary {
                channel_id: channel.id,
                name: channel.name.clone(),
            })
            .collect())
    }

    pub fn channel_details(&self, actor: UserId, channel_id: ChannelId) -> Result<ChannelDetails> {
        let graph = self.store.read();
        let user = graph.actor(actor)?;
        let channel = graph.channel(channel_id)?;
        if !authz::is_channel_member(channel, user) {
            return Err(AppError::authorization(
                "Only members can view channel details",
            ));
        }

        let profiles = |ids: &[UserId]| -> Vec<UserProfile> {
            ids.iter()
                .filter_map(|id| graph.user(*id).ok())
                .map(UserProfile::from)
                .collect()
        };
        Ok(ChannelDetails {
            name: channel.name.clone(),
            is_public: channel.is_public,
            owner_members: profiles(&channel.owners),
            all_members: profiles(&channel.members),
        })
    }

    /// Add another user to a channel the actor is already in
    pub fn invite(&self, actor: UserId, channel_id: ChannelId, target: UserId) -> Result<()> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        let channel = graph.channel(channel_id)?;
        let target_user = graph.active_user(target)?;

        if !authz::is_channel_member(channel, user) {
            return Err(AppError::authorization(
                "Only members can invite to a channel",
            ));
        }
        if authz::is_channel_member(channel, target_user) {
            return Err(AppError::validation(format!(
                "u_id {target} is already a member of this channel"
            )));
        }

        graph.link_channel_member(channel_id, target)?;
        graph.record_provenance(
            target,
            ProvenanceKind::AddedToChannel {
                channel: channel_id,
                by: actor,
            },
        );

        tracing::info!(
            channel_id = %channel_id,
            actor_id = %actor,
            user_id = %target,
            "User invited to channel"
        );
        Ok(())
    }

    /// Join a public channel; global owners may also join private ones
    pub fn join(&self, actor: UserId, channel_id: ChannelId) -> Result<()> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        let channel = graph.channel(channel_id)?;

        if authz::is_channel_member(channel, user) {
            return Err(AppError::validation("Already a member of this channel"));
        }
        if !channel.is_public && !authz::is_global_owner(user) {
            return Err(AppError::authorization("Channel is private"));
        }

        graph.link_channel_member(channel_id, actor)?;
        graph.record_provenance(
            actor,
            ProvenanceKind::JoinedChannel {
                channel: channel_id,
            },
        );

        tracing::info!(channel_id = %channel_id, user_id = %actor, "User joined channel");
        Ok(())
    }

    /// Grant channel ownership to an existing member
    pub fn add_owner(&self, actor: UserId, channel_id: ChannelId, target: UserId) -> Result<()> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        let channel = graph.channel(channel_id)?;
        let target_user = graph.active_user(target)?;

        if !authz::is_channel_owner(channel, user) && !authz::is_global_owner(user) {
            return Err(AppError::authorization(
                "Only channel owners can add owners",
            ));
        }
        if authz::is_channel_owner(channel, target_user) {
            return Err(AppError::authorization(format!(
                "u_id {target} is already an owner of this channel"
            )));
        }
        if !authz::is_channel_member(channel, target_user) {
            return Err(AppError::validation(format!(
                "u_id {target} is not a member of this channel"
            )));
        }

        graph.grant_channel_owner(channel_id, target)?;
        tracing::info!(
            channel_id = %channel_id,
            actor_id = %actor,
            user_id = %target,
            "Channel owner added"
        );
        Ok(())
    }

    /// Revoke channel ownership; the last owner cannot be removed
    pub fn remove_owner(&self, actor: UserId, channel_id: ChannelId, target: UserId) -> Result<()> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        let channel = graph.channel(channel_id)?;
        let target_user = graph.active_user(target)?;

        if !authz::is_channel_owner(channel, user) && !authz::is_global_owner(user) {
            return Err(AppError::authorization(
                "Only channel owners can remove owners",
            ));
        }
        if !authz::is_channel_owner(channel, target_user) {
            return Err(AppError::validation(format!(
                "u_id {target} is not an owner of this channel"
            )));
        }
        if channel.owners.len() == 1 {
            return Err(AppError::validation(
                "Cannot remove the only owner of a channel",
            ));
        }

        graph.revoke_channel_owner(channel_id, target)?;
        tracing::info!(
            channel_id = %channel_id,
            actor_id = %actor,
            user_id = %target,
            "Channel owner removed"
        );
        Ok(())
    }

    /// Leave a channel; the last member out tombstones it
    pub fn leave(&self, actor: UserId, channel_id: ChannelId) -> Result<()> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        let channel = graph.channel(channel_id)?;
        if !authz::is_channel_member(channel, user) {
            return Err(AppError::authorization("Not a member of this channel"));
        }

        let tombstoned = graph.unlink_channel_member(channel_id, actor)?;
        if tombstoned {
            crate::metrics::observe_graph(&graph);
            tracing::info!(channel_id = %channel_id, "Channel emptied and tombstoned");
        }

        tracing::info!(channel_id = %channel_id, user_id = %actor, "User left channel");
        Ok(())
    }

    // =========================================================================
    // Direct messages
    // =========================================================================

    /// Create a DM between the actor and `members`
    pub fn create_dm(&self, actor: UserId, members: &[UserId]) -> Result<DmId> {
        let mut graph = self.store.write();
        graph.actor(actor)?;
        for member in members {
            graph.active_user(*member)?;
        }

        let dm_id = graph.push_dm(|id| Dm {
            id,
            name: String::new(),
            creator: actor,
            members: Vec::new(),
            lifecycle: Lifecycle::Active,
            created_at: Utc::now(),
        });
        graph.link_dm_member(dm_id, actor)?;
        for member in members.iter().copied().filter(|id| *id != actor) {
            // Duplicated ids collapse into one membership.
            if graph.user(member)?.dms.contains(&dm_id) {
                continue;
            }
            graph.link_dm_member(dm_id, member)?;
            graph.record_provenance(member, ProvenanceKind::AddedToDm { dm: dm_id, by: actor });
        }
        crate::metrics::observe_graph(&graph);

        tracing::info!(
            dm_id = %dm_id,
            user_id = %actor,
            members = graph.dm(dm_id)?.members.len(),
            "DM created"
        );
        Ok(dm_id)
    }

    pub fn list_dms(&self, actor: UserId) -> Result<Vec<DmSummary>> {
        let graph = self.store.read();
        let user = graph.actor(actor)?;
        Ok(user
            .dms
            .iter()
            .filter_map(|id| graph.dm(*id).ok())
            .map(|dm| DmSummary {
                dm_id: dm.id,
                name: dm.name.clone(),
            })
            .collect())
    }

    pub fn dm_details(&self, actor: UserId, dm_id: DmId) -> Result<DmDetails> {
        let graph = self.store.read();
        let user = graph.actor(actor)?;
        let dm = graph.dm(dm_id)?;
        if !authz::is_dm_member(dm, user) {
            return Err(AppError::authorization("Only members can view DM details"));
        }

        Ok(DmDetails {
            name: dm.name.clone(),
            members: dm
                .members
                .iter()
                .filter_map(|id| graph.user(*id).ok())
                .map(UserProfile::from)
                .collect(),
        })
    }

    pub fn invite_dm(&self, actor: UserId, dm_id: DmId, target: UserId) -> Result<()> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        let dm = graph.dm(dm_id)?;
        let target_user = graph.active_user(target)?;

        if !authz::is_dm_member(dm, user) {
            return Err(AppError::authorization("Only members can invite to a DM"));
        }
        if authz::is_dm_member(dm, target_user) {
            return Err(AppError::authorization(format!(
                "u_id {target} is already a member of this DM"
            )));
        }

        graph.link_dm_member(dm_id, target)?;
        graph.record_provenance(target, ProvenanceKind::AddedToDm { dm: dm_id, by: actor });

        tracing::info!(
            dm_id = %dm_id,
            actor_id = %actor,
            user_id = %target,
            "User invited to DM"
        );
        Ok(())
    }

    pub fn leave_dm(&self, actor: UserId, dm_id: DmId) -> Result<()> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        let dm = graph.dm(dm_id)?;
        if !authz::is_dm_member(dm, user) {
            return Err(AppError::authorization("Not a member of this DM"));
        }

        graph.unlink_dm_member(dm_id, actor)?;
        tracing::info!(dm_id = %dm_id, user_id = %actor, "User left DM");
        Ok(())
    }

    /// Remove a DM; only its creator may do this
    pub fn remove_dm(&self, actor: UserId, dm_id: DmId) -> Result<()> {
        let mut graph = self.store.write();
        let user = graph.actor(actor)?;
        let dm = graph.dm(dm_id)?;
        if !authz::is_dm_creator(dm, user) {
            return Err(AppError::authorization(
                "Only the creator can remove a DM",
            ));
        }

        graph.tombstone_dm(dm_id)?;
        graph.redact_conversation(Conversation::Dm(dm_id), Redaction::ConversationRemoved);
        crate::metrics::observe_graph(&graph);

        tracing::info!(dm_id = %dm_id, user_id = %actor, "DM removed");
        Ok(())
    }
}
