//! Mail item types.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::account::DeviceId;

/// Which way a mail item travels relative to its owning device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Addressed to the owning device.
    Inbound,
    /// Sent by the owning device, waiting for the relay.
    Outbound,
}

impl Direction {
    /// Database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Direction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "inbound" => Ok(Direction::Inbound),
            "outbound" => Ok(Direction::Outbound),
            _ => Err(format!("unknown mail direction: {value}")),
        }
    }
}

/// Lifecycle state of a mail item.
///
/// Only ever moves forward: pending, delivered, deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MailState {
    /// Waiting to be handed out.
    Pending,
    /// Handed out to the device (or to the relay, for outbound items).
    Delivered,
    /// Acknowledged; eligible for purging.
    Deleted,
}

impl MailState {
    /// Database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MailState::Pending => "pending",
            MailState::Delivered => "delivered",
            MailState::Deleted => "deleted",
        }
    }
}

impl fmt::Display for MailState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MailState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(MailState::Pending),
            "delivered" => Ok(MailState::Delivered),
            "deleted" => Ok(MailState::Deleted),
            _ => Err(format!("unknown mail state: {value}")),
        }
    }
}

/// A stored mail item.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MailItem {
    /// Mail id, monotonically increasing.
    pub id: i64,
    /// Device the item belongs to.
    #[sqlx(try_from = "String")]
    pub owner_device_id: DeviceId,
    /// Inbound or outbound.
    #[sqlx(try_from = "String")]
    pub direction: Direction,
    /// Envelope sender address.
    pub sender: String,
    /// Envelope recipient address.
    pub recipient: String,
    /// Subject, if the source carried one.
    pub subject: Option<String>,
    /// Opaque message content.
    pub body: Vec<u8>,
    /// Current lifecycle state.
    #[sqlx(try_from = "String")]
    pub state: MailState,
    /// When the item was stored.
    pub created_at: DateTime<Utc>,
    /// When the item was handed out.
    pub delivered_at: Option<DateTime<Utc>>,
    /// When the item was acknowledged.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A mail item to be stored.
#[derive(Debug, Clone)]
pub struct NewMailItem {
    /// Device the item belongs to.
    pub owner_device_id: DeviceId,
    /// Inbound or outbound.
    pub direction: Direction,
    /// Envelope sender address.
    pub sender: String,
    /// Envelope recipient address.
    pub recipient: String,
    /// Optional subject.
    pub subject: Option<String>,
    /// Opaque message content.
    pub body: Vec<u8>,
}

impl NewMailItem {
    /// Create an item addressed to `owner`.
    pub fn inbound(
        owner: DeviceId,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            owner_device_id: owner,
            direction: Direction::Inbound,
            sender: sender.into(),
            recipient: recipient.into(),
            subject: None,
            body: body.into(),
        }
    }

    /// Create an item sent by `owner`.
    pub fn outbound(
        owner: DeviceId,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            direction: Direction::Outbound,
            ..Self::inbound(owner, sender, recipient, body)
        }
    }

    /// Set the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}
