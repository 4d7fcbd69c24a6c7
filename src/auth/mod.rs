//! Authentication
//!
//! Handles:
//! - Password hashing
//! - Signed session tokens and the live session registry
//! - Bearer token extraction
//! - Password reset delivery

mod middleware;
pub mod password;
mod reset;
pub mod session;

pub use middleware::{BearerToken, CurrentUser};
pub use reset::{LogMailer, ResetMailer};
pub use session::{Session, SessionRegistry, create_session_token, verify_session_token};
