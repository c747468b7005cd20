//! Agora notification core.
//!
//! Pure logic shared by the notify actions and post delivery:
//! - 2-bit preference encoding (alert / email)
//! - UI mode table and preference keys per target
//! - HMAC-SHA256 unsubscribe tokens for one-click links without a session

pub mod pref;
pub mod token;

use thiserror::Error;

pub use pref::{NotifyKind, NotifyMode, NotifyPref, effective_pref};
pub use token::{create_unsubscribe_token, unsubscribe_url, verify_unsubscribe_token};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification mode {0} is out of range")]
    InvalidMode(i64),
}
