//! Authorization predicates
//!
//! Stateless checks over already-resolved entities. Callers decide whether
//! a `false` becomes an authorization or a validation error; the same
//! condition means different things for the actor and for a target.

use crate::data::{Channel, Conversation, Dm, Graph, Message, User};

pub fn is_global_owner(user: &User) -> bool {
    !user.is_removed() && user.is_owner()
}

pub fn is_channel_owner(channel: &Channel, user: &User) -> bool {
    channel.owners.contains(&user.id)
}

pub fn is_channel_member(channel: &Channel, user: &User) -> bool {
    channel.members.contains(&user.id)
}

pub fn is_dm_member(dm: &Dm, user: &User) -> bool {
    dm.members.contains(&user.id)
}

pub fn is_dm_creator(dm: &Dm, user: &User) -> bool {
    dm.creator == user.id
}

/// Membership of either kind of conversation; dead conversations have none
pub fn is_conversation_member(graph: &Graph, conversation: Conversation, user: &User) -> bool {
    match conversation {
        Conversation::Channel(id) => graph
            .channel(id)
            .is_ok_and(|channel| is_channel_member(channel, user)),
        Conversation::Dm(id) => graph.dm(id).is_ok_and(|dm| is_dm_member(dm, user)),
    }
}

/// Channel owner, or creator of a DM
pub fn is_conversation_owner(graph: &Graph, conversation: Conversation, user: &User) -> bool {
    match conversation {
        Conversation::Channel(id) => graph
            .channel(id)
            .is_ok_and(|channel| is_channel_owner(channel, user)),
        Conversation::Dm(id) => graph.dm(id).is_ok_and(|dm| is_dm_creator(dm, user)),
    }
}

/// May post into the conversation: members, plus global owners for channels
pub fn can_post(graph: &Graph, conversation: Conversation, user: &User) -> bool {
    is_conversation_member(graph, conversation, user)
        || (matches!(conversation, Conversation::Channel(_)) && is_global_owner(user))
}

/// May edit or remove a message: its sender, the conversation owner, or a global owner
pub fn can_moderate(graph: &Graph, message: &Message, user: &User) -> bool {
    message.sender == user.id
        || is_conversation_owner(graph, message.parent, user)
        || is_global_owner(user)
}

/// May pin or unpin: the conversation owner, who must also still be a member
pub fn can_pin(graph: &Graph, message: &Message, user: &User) -> bool {
    is_conversation_owner(graph, message.parent, user)
        && is_conversation_member(graph, message.parent, user)
}
