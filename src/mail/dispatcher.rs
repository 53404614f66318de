//! Device-facing mail operations.
//!
//! Every operation authenticates the device first. Nothing here retries:
//! a failed call is repeated by the device on its next poll, which is safe
//! because each operation is a single conditional transition in the store.

use thiserror::Error;
use tracing::{debug, info};

use super::recipient::{Recipient, RecipientError};
use super::repository::MailRepository;
use super::types::{MailItem, NewMailItem};
use crate::account::{AccountError, AccountRegistry, AccountRepository, DeviceId, DeviceIdError};
use crate::bridge::AddressPattern;
use crate::config::MailConfig;
use crate::db::Database;
use crate::secret::SecretStore;
use crate::GatewayError;

/// Protocol dispatcher errors.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The device id is malformed.
    #[error("invalid device id: {0}")]
    InvalidDeviceId(#[from] DeviceIdError),

    /// No account exists for the device.
    #[error("unknown account")]
    UnknownAccount,

    /// The device credential does not match.
    #[error("bad credential")]
    BadCredential,

    /// The recipient is malformed or cannot receive mail.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(#[from] RecipientError),

    /// The payload is empty or too large.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] GatewayError),
}

impl From<AccountError> for DispatchError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidDeviceId(e) => DispatchError::InvalidDeviceId(e),
            AccountError::NotFound => DispatchError::UnknownAccount,
            // A credential that fails validation can never match.
            AccountError::BadCredential | AccountError::InvalidCredential(_) => {
                DispatchError::BadCredential
            }
            AccountError::AlreadyExists => {
                DispatchError::Store(GatewayError::Conflict("account already exists".to_string()))
            }
            AccountError::Store(e) => DispatchError::Store(e),
        }
    }
}

/// Result of a Check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckResult {
    /// Inbound items waiting for the device.
    pub pending: i64,
    /// Seconds the device should wait before polling again.
    pub interval_secs: u64,
}

/// A mail submitted by a device.
#[derive(Debug, Clone)]
pub struct SendRequest {
    /// Recipient address, a device address or a real email address.
    pub recipient: String,
    /// Optional subject.
    pub subject: Option<String>,
    /// Opaque message content.
    pub payload: Vec<u8>,
}

impl SendRequest {
    /// Create a new send request.
    pub fn new(recipient: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            recipient: recipient.into(),
            subject: None,
            payload: payload.into(),
        }
    }

    /// Set the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Implements Check, Receive, Delete and Send.
pub struct ProtocolDispatcher<'a> {
    db: &'a Database,
    secret: &'a SecretStore,
    config: &'a MailConfig,
    pattern: &'a AddressPattern,
}

impl<'a> ProtocolDispatcher<'a> {
    /// Create a dispatcher over shared gateway state.
    pub fn new(
        db: &'a Database,
        secret: &'a SecretStore,
        config: &'a MailConfig,
        pattern: &'a AddressPattern,
    ) -> Self {
        Self {
            db,
            secret,
            config,
            pattern,
        }
    }

    async fn authenticate(&self, device_id: &DeviceId, credential: &str) -> Result<(), DispatchError> {
        AccountRegistry::new(self.db, self.secret)
            .authenticate(device_id.as_str(), credential)
            .await?;
        Ok(())
    }

    /// Report how many items are waiting and when to poll next.
    ///
    /// The device may ask for a longer interval, never a shorter one than
    /// the configured floor.
    pub async fn check(
        &self,
        device_id: &DeviceId,
        credential: &str,
        interval_hint: Option<u64>,
    ) -> Result<CheckResult, DispatchError> {
        self.authenticate(device_id, credential).await?;

        let pending = MailRepository::new(self.db.pool())
            .count_pending(device_id)
            .await?;
        let interval_secs = self.poll_interval(interval_hint);

        debug!(device_id = %device_id, pending, interval_secs, "Check");
        Ok(CheckResult {
            pending,
            interval_secs,
        })
    }

    fn poll_interval(&self, hint: Option<u64>) -> u64 {
        let floor = self.config.check_interval_secs;
        hint.unwrap_or(floor)
            .max(floor)
            .min(self.config.max_check_interval_secs.max(floor))
    }

    /// Hand out pending inbound items, oldest first.
    ///
    /// `limit` is capped at the configured receive limit.
    pub async fn receive(
        &self,
        device_id: &DeviceId,
        credential: &str,
        limit: Option<u32>,
    ) -> Result<Vec<MailItem>, DispatchError> {
        self.authenticate(device_id, credential).await?;

        let max = self.config.receive_limit;
        let limit = limit.unwrap_or(max).clamp(1, max.max(1));
        let mails = MailRepository::new(self.db.pool())
            .fetch_pending(device_id, limit)
            .await?;

        if !mails.is_empty() {
            info!(device_id = %device_id, count = mails.len(), "Mail delivered to device");
        }
        Ok(mails)
    }

    /// Acknowledge delivered items; returns how many were acknowledged.
    pub async fn delete(
        &self,
        device_id: &DeviceId,
        credential: &str,
        ids: &[i64],
    ) -> Result<u64, DispatchError> {
        self.authenticate(device_id, credential).await?;

        let deleted = MailRepository::new(self.db.pool())
            .mark_deleted(device_id, ids)
            .await?;

        debug!(device_id = %device_id, requested = ids.len(), deleted, "Delete");
        Ok(deleted)
    }

    /// Accept a mail from the device.
    ///
    /// Mail to another device becomes an inbound item of that device; mail
    /// to a real address becomes an outbound item for the relay.
    pub async fn send(
        &self,
        device_id: &DeviceId,
        credential: &str,
        request: &SendRequest,
    ) -> Result<MailItem, DispatchError> {
        self.authenticate(device_id, credential).await?;

        if request.payload.is_empty() {
            return Err(DispatchError::InvalidPayload("payload is empty".to_string()));
        }
        if request.payload.len() > self.config.max_payload_bytes {
            return Err(DispatchError::InvalidPayload(format!(
                "payload exceeds {} bytes",
                self.config.max_payload_bytes
            )));
        }

        let sender = self.pattern.format(device_id);
        let item = match Recipient::parse(&request.recipient, self.pattern)? {
            Recipient::Device(target) => {
                let registered = AccountRepository::new(self.db.pool())
                    .exists(&target)
                    .await?;
                if !registered {
                    return Err(RecipientError::UnregisteredDevice(target).into());
                }
                let recipient = self.pattern.format(&target);
                NewMailItem::inbound(target, sender, recipient, request.payload.clone())
            }
            Recipient::External(address) => {
                NewMailItem::outbound(device_id.clone(), sender, address, request.payload.clone())
            }
        };
        let item = match &request.subject {
            Some(subject) => item.with_subject(subject.clone()),
            None => item,
        };

        let mail = MailRepository::new(self.db.pool()).insert(&item).await?;
        info!(
            device_id = %device_id,
            mail_id = mail.id,
            direction = %mail.direction,
            "Mail accepted from device"
        );
        Ok(mail)
    }
}
