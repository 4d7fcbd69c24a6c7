//! Session management
//!
//! Tokens are HMAC-signed and carry the session id. The registry keeps the
//! set of live session ids, so logout and account removal take effect
//! immediately even though the token itself is still well-formed.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::data::UserId;
use crate::error::AppError;

/// Signed session payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    /// Random id tracked by the [`SessionRegistry`]
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

fn invalid_token() -> AppError {
    AppError::authorization("Invalid token")
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// Authorization error if the token is malformed, tampered with or expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let (payload_b64, signature_b64) = token.split_once('.').ok_or_else(invalid_token)?;

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Config(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| invalid_token())?;
    mac.verify_slice(&signature).map_err(|_| invalid_token())?;

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| invalid_token())?;
    let session: Session = serde_json::from_slice(&payload).map_err(|_| invalid_token())?;

    if session.is_expired() {
        return Err(invalid_token());
    }
    Ok(session)
}

#[derive(Debug, Clone, Copy)]
struct LiveSession {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

/// Live sessions, keyed by session id
///
/// Expired entries are pruned whenever a new session is issued.
pub struct SessionRegistry {
    secret: String,
    max_age: Duration,
    live: Mutex<HashMap<String, LiveSession>>,
}

impl SessionRegistry {
    pub fn new(secret: impl Into<String>, max_age_seconds: i64) -> Self {
        Self {
            secret: secret.into(),
            max_age: Duration::seconds(max_age_seconds),
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Start a session for `user_id` and return its token
    pub fn issue(&self, user_id: UserId) -> Result<String, AppError> {
        let session_id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let now = Utc::now();
        let session = Session {
            user_id,
            session_id: session_id.clone(),
            created_at: now,
            expires_at: now + self.max_age,
        };

        let token = create_session_token(&session, &self.secret)?;
        let mut live = self.live.lock();
        live.retain(|_, entry| entry.expires_at >= now);
        live.insert(
            session_id,
            LiveSession {
                user_id,
                expires_at: session.expires_at,
            },
        );
        tracing::debug!(user_id = %user_id, "Session issued");
        Ok(token)
    }

    /// The user behind a live token
    pub fn resolve(&self, token: &str) -> Result<UserId, AppError> {
        let session = verify_session_token(token, &self.secret)?;
        match self.live.lock().get(&session.session_id) {
            Some(entry) if entry.user_id == session.user_id => Ok(entry.user_id),
            _ => Err(invalid_token()),
        }
    }

    /// End the session behind `token`; `false` if it was not live
    pub fn revoke(&self, token: &str) -> bool {
        verify_session_token(token, &self.secret)
            .map(|session| self.live.lock().remove(&session.session_id).is_some())
            .unwrap_or(false)
    }

    /// End every session of one user
    pub fn revoke_user(&self, user_id: UserId) {
        self.live.lock().retain(|_, entry| entry.user_id != user_id);
        tracing::debug!(user_id = %user_id, "Sessions revoked");
    }

    /// Forget every session
    pub fn clear(&self) {
        self.live.lock().clear();
    }
}
