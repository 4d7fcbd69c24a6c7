//! Password reset delivery

use crate::data::UserId;

/// Hands a reset code to the account holder
pub trait ResetMailer: Send + Sync {
    fn send_reset_code(&self, user_id: UserId, email: &str, code: &str);
}

/// Writes reset codes to the log instead of sending mail
#[derive(Debug, Default)]
pub struct LogMailer;

impl ResetMailer for LogMailer {
    fn send_reset_code(&self, user_id: UserId, email: &str, code: &str) {
        tracing::info!(user_id = %user_id, email, reset_code = code, "Password reset requested");
    }
}
