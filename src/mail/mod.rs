//! Mail store and device protocol.
//!
//! This module provides:
//! - Mail item persistence with forward-only state transitions
//! - The Check/Receive/Delete/Send dispatcher
//! - Recipient classification for device-sent mail

mod dispatcher;
mod recipient;
mod repository;
mod types;

pub use dispatcher::{CheckResult, DispatchError, ProtocolDispatcher, SendRequest};
pub use recipient::{Recipient, RecipientError, MAX_ADDRESS_LENGTH};
pub use repository::MailRepository;
pub use types::{Direction, MailItem, MailState, NewMailItem};
