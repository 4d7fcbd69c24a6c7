//! Fixtures shared by the service unit tests

use crate::data::{GlobalPermission, Store, UserId, bare_user};

/// Register users directly in the graph, skipping password hashing.
/// The first one becomes a global owner, like a first registration.
pub(crate) fn seed_users(store: &Store, handles: &[&str]) -> Vec<UserId> {
    let mut graph = store.write();
    handles
        .iter()
        .map(|handle| {
            let first = graph.users().is_empty();
            graph.push_user(|id| {
                let mut user = bare_user(id, handle);
                if first {
                    user.permission = GlobalPermission::Owner;
                }
                user
            })
        })
        .collect()
}

/// Member lists and user backlinks agree everywhere
pub(crate) fn assert_symmetric(store: &Store) {
    let graph = store.read();
    for channel in graph.channels().iter().filter(|c| c.is_live()) {
        for member in &channel.members {
            assert!(graph.user(*member).unwrap().channels.contains(&channel.id));
        }
        for owner in &channel.owners {
            assert!(channel.members.contains(owner));
        }
    }
    for dm in graph.dms().iter().filter(|d| d.is_live()) {
        for member in &dm.members {
            assert!(graph.user(*member).unwrap().dms.contains(&dm.id));
        }
    }
    for user in graph.users() {
        for channel in &user.channels {
            assert!(graph.channel(*channel).unwrap().members.contains(&user.id));
        }
        for dm in &user.dms {
            assert!(graph.dm(*dm).unwrap().members.contains(&user.id));
        }
    }
}
