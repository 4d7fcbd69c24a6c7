//! Identity service
//!
//! Registration, credentials, profiles and global permissions.

use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::auth::password;
use crate::data::{AccountState, GlobalPermission, Graph, Store, User, UserId};
use crate::error::{AppError, Result};
use crate::service::authz;

const MIN_PASSWORD_LEN: usize = 6;
const MAX_NAME_LEN: usize = 50;
const MIN_HANDLE_LEN: usize = 3;
const MAX_HANDLE_LEN: usize = 20;

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(r"^[a-zA-Z0-9]+[\._]?[a-zA-Z0-9]+@\w+\.\w{2,3}$")
        .expect("email pattern is valid");
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub u_id: UserId,
    pub email: String,
    pub name_first: String,
    pub name_last: String,
    pub handle_str: String,
    pub profile_img_url: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            u_id: user.id,
            email: user.email.clone(),
            name_first: user.name_first.clone(),
            name_last: user.name_last.clone(),
            handle_str: user.handle.clone(),
            profile_img_url: user.profile_img_url.clone(),
        }
    }
}

/// Registration input
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name_first: String,
    pub name_last: String,
}

/// Profile fields to change; `None` leaves a field as is
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name_first: Option<String>,
    pub name_last: Option<String>,
    pub email: Option<String>,
    pub handle: Option<String>,
}

/// Identity service
pub struct IdentityService {
    store: Arc<Store>,
}

impl IdentityService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    // =========================================================================
    // Registration and credentials
    // =========================================================================

    /// Register a new user
    ///
    /// The first user ever registered becomes a global owner; everyone
    /// after that starts as a member.
    pub fn register(&self, new_user: NewUser) -> Result<UserId> {
        validate_email(&new_user.email)?;
        if new_user.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        validate_name(&new_user.name_first, "name_first")?;
        validate_name(&new_user.name_last, "name_last")?;

        // Hashed outside the graph lock.
        let password_hash = password::hash_password(&new_user.password)?;

        let mut graph = self.store.write();
        if graph.email_taken(&new_user.email, None) {
            return Err(AppError::validation("Email is already registered"));
        }

        let handle = generate_handle(&graph, &new_user.name_first, &new_user.name_last);
        let permission = if graph.users().is_empty() {
            GlobalPermission::Owner
        } else {
            GlobalPermission::Member
        };

        let id = graph.push_user(|id| User {
            id,
            email: new_user.email,
            password_hash,
            name_first: new_user.name_first,
            name_last: new_user.name_last,
            handle: handle.clone(),
            permission,
            profile_img_url: None,
            reset_code: None,
            channels: Default::default(),
            dms: Default::default(),
            stats: None,
            state: AccountState::Active,
            created_at: Utc::now(),
        });
        crate::metrics::observe_graph(&graph);

        tracing::info!(
            user_id = %id,
            handle = %handle,
            permission = permission.as_str(),
            "User registered"
        );
        Ok(id)
    }

    /// Check credentials and return the user they belong to
    pub fn login(&self, email: &str, password: &str) -> Result<UserId> {
        let (id, hash) = {
            let graph = self.store.read();
            let user = graph
                .user_by_email(email)
                .ok_or_else(|| AppError::validation("Email is not registered"))?;
            (user.id, user.password_hash.clone())
        };

        if !password::verify_password(password, &hash) {
            return Err(AppError::validation("Incorrect password"));
        }

        tracing::debug!(user_id = %id, "User logged in");
        Ok(id)
    }

    /// Issue a reset code for the account registered under `email`
    ///
    /// Returns `None` for unknown addresses so callers cannot probe which
    /// emails are registered.
    pub fn request_password_reset(&self, email: &str) -> Option<(UserId, String)> {
        let mut graph = self.store.write();
        let id = graph.user_by_email(email)?.id;
        let code = password::generate_reset_code();
        let user = graph.user_mut(id).ok()?;
        user.reset_code = Some(code.clone());

        tracing::info!(user_id = %id, "Password reset requested");
        Some((id, code))
    }

    /// Consume a reset code and set a new password
    pub fn reset_password(&self, reset_code: &str, new_password: &str) -> Result<UserId> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let password_hash = password::hash_password(new_password)?;

        let mut graph = self.store.write();
        let id = graph
            .user_by_reset_code(reset_code)
            .ok_or_else(|| AppError::validation("Reset code is not valid"))?
            .id;
        let user = graph.user_mut(id)?;
        user.password_hash = password_hash;
        user.reset_code = None;

        tracing::info!(user_id = %id, "Password reset");
        Ok(id)
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    pub fn profile(&self, actor: UserId, target: UserId) -> Result<UserProfile> {
        let graph = self.store.read();
        graph.actor(actor)?;
        Ok(graph.user(target)?.into())
    }

    pub fn users_all(&self, actor: UserId) -> Result<Vec<UserProfile>> {
        let graph = self.store.read();
        graph.actor(actor)?;
        Ok(graph
            .users()
            .iter()
            .filter(|user| !user.is_removed())
            .map(UserProfile::from)
            .collect())
    }

    /// Apply a profile change; every field is validated before any is written
    pub fn set_profile(&self, actor: UserId, patch: ProfilePatch) -> Result<()> {
        let mut graph = self.store.write();
        graph.actor(actor)?;

        if let Some(name) = &patch.name_first {
            validate_name(name, "name_first")?;
        }
        if let Some(name) = &patch.name_last {
            validate_name(name, "name_last")?;
        }
        if let Some(email) = &patch.email {
            validate_email(email)?;
            if graph.email_taken(email, Some(actor)) {
                return Err(AppError::validation(
                    "Email address is already being used by another user",
                ));
            }
        }
        if let Some(handle) = &patch.handle {
            let len = handle.chars().count();
            if !(MIN_HANDLE_LEN..=MAX_HANDLE_LEN).contains(&len) {
                return Err(AppError::validation(format!(
                    "handle_str must be between {MIN_HANDLE_LEN} and {MAX_HANDLE_LEN} characters"
                )));
            }
            if graph.handle_taken(handle, Some(actor)) {
                return Err(AppError::validation(
                    "Handle is already used by another user",
                ));
            }
        }

        let handle_changed = patch.handle.is_some();
        let user = graph.user_mut(actor)?;
        if let Some(name) = patch.name_first {
            user.name_first = name;
        }
        if let Some(name) = patch.name_last {
            user.name_last = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(handle) = patch.handle {
            user.handle = handle;
        }

        if handle_changed {
            let dms: Vec<_> = user.dms.iter().copied().collect();
            for dm in dms {
                graph.recompute_dm_name(dm)?;
            }
        }

        tracing::info!(user_id = %actor, "Profile updated");
        Ok(())
    }

    pub fn set_name(&self, actor: UserId, name_first: String, name_last: String) -> Result<()> {
        self.set_profile(
            actor,
            ProfilePatch {
                name_first: Some(name_first),
                name_last: Some(name_last),
                ..Default::default()
            },
        )
    }

    pub fn set_email(&self, actor: UserId, email: String) -> Result<()> {
        self.set_profile(
            actor,
            ProfilePatch {
                email: Some(email),
                ..Default::default()
            },
        )
    }

    pub fn set_handle(&self, actor: UserId, handle: String) -> Result<()> {
        self.set_profile(
            actor,
            ProfilePatch {
                handle: Some(handle),
                ..Default::default()
            },
        )
    }

    /// Store the URL the image collaborator produced
    pub fn set_profile_image(&self, actor: UserId, url: String) -> Result<()> {
        let mut graph = self.store.write();
        graph.actor(actor)?;
        graph.user_mut(actor)?.profile_img_url = Some(url);
        Ok(())
    }

    // =========================================================================
    // Administration
    // =========================================================================

    /// Set a user's global permission (1 = owner, 2 = member)
    pub fn change_permission(&self, actor: UserId, target: UserId, permission_id: i64) -> Result<()> {
        let mut graph = self.store.write();
        let actor_user = graph.actor(actor)?;
        let is_owner = authz::is_global_owner(actor_user);
        let current = graph.active_user(target)?.permission;
        let permission = GlobalPermission::from_id(permission_id)
            .ok_or_else(|| AppError::validation(format!("permission_id {permission_id} is not valid")))?;

        if !is_owner {
            return Err(AppError::authorization(
                "Only global owners can change permissions",
            ));
        }
        if actor == target
            && permission == GlobalPermission::Member
            && graph.owner_count() == 1
        {
            return Err(AppError::validation(
                "Cannot demote the only global owner",
            ));
        }
        if current == permission {
            return Err(AppError::validation(format!(
                "User already has permission {}",
                permission.as_str()
            )));
        }

        graph.user_mut(target)?.permission = permission;
        tracing::info!(
            actor_id = %actor,
            user_id = %target,
            permission = permission.as_str(),
            "Global permission changed"
        );
        Ok(())
    }

    /// Remove a user from the platform
    ///
    /// The id stays allocated. Profile fields are scrubbed, authored
    /// messages are redacted and every membership is severed.
    pub fn remove_user(&self, actor: UserId, target: UserId) -> Result<()> {
        let mut graph = self.store.write();
        let actor_user = graph.actor(actor)?;
        let is_owner = authz::is_global_owner(actor_user);
        let target_is_owner = graph.active_user(target)?.is_owner();

        if !is_owner {
            return Err(AppError::authorization("Only global owners can remove users"));
        }
        if target_is_owner && graph.owner_count() == 1 {
            return Err(AppError::validation(
                "Cannot remove the only global owner",
            ));
        }

        let (channels, dms) = {
            let user = graph.user(target)?;
            (
                user.channels.iter().copied().collect::<Vec<_>>(),
                user.dms.iter().copied().collect::<Vec<_>>(),
            )
        };
        for channel in channels {
            graph.unlink_channel_member(channel, target)?;
        }
        for dm in dms {
            graph.unlink_dm_member(dm, target)?;
        }
        graph.redact_sender(target);

        let user = graph.user_mut(target)?;
        user.state = AccountState::Removed;
        user.permission = GlobalPermission::Member;
        user.name_first = "Removed".to_string();
        user.name_last = "user".to_string();
        user.email.clear();
        user.handle.clear();
        user.profile_img_url = None;
        user.reset_code = None;
        crate::metrics::observe_graph(&graph);

        tracing::info!(actor_id = %actor, user_id = %target, "User removed");
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<()> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(AppError::validation(format!("{email} is not a valid email")))
    }
}

fn validate_name(name: &str, field: &str) -> Result<()> {
    let len = name.chars().count();
    if (1..=MAX_NAME_LEN).contains(&len) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{field} must be between 1 and {MAX_NAME_LEN} characters"
        )))
    }
}

/// Lowercase alphanumeric concatenation of both names, at most 20 chars,
/// with the smallest numeric suffix that makes it unique.
fn generate_handle(graph: &Graph, name_first: &str, name_last: &str) -> String {
    let mut base: String = format!("{name_first}{name_last}")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_HANDLE_LEN)
        .collect();
    if base.is_empty() {
        base = "user".to_string();
    }

    if !graph.handle_taken(&base, None) {
        return base;
    }

    (0u64..)
        .map(|n| {
            let suffix = n.to_string();
            let keep = MAX_HANDLE_LEN.saturating_sub(suffix.len()).min(base.len());
            format!("{}{}", &base[..keep], suffix)
        })
        .find(|candidate| !graph.handle_taken(candidate, None))
        .unwrap_or(base)
}
