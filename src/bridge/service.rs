//! Routing of inbound email into device mailboxes.

use thiserror::Error;
use tracing::{debug, info};

use super::address::{AddressError, AddressPattern};
use super::envelope::InboundEnvelope;
use crate::account::{AccountRepository, DeviceId};
use crate::db::Database;
use crate::mail::{MailItem, MailRepository, NewMailItem};
use crate::GatewayError;

/// Email bridge errors.
#[derive(Error, Debug)]
pub enum RouteError {
    /// The recipient is not a device address on this domain.
    #[error("no matching device address: {0}")]
    NoMatch(AddressError),

    /// The recipient names a device that has never registered.
    #[error("device {0} is not registered")]
    UnregisteredDevice(DeviceId),

    /// The message is larger than a device mailbox accepts.
    #[error("message of {0} bytes is too large")]
    PayloadTooLarge(usize),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] GatewayError),
}

impl RouteError {
    /// Whether the provider should redeliver the message later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RouteError::Store(_))
    }
}

/// Turns inbound email into inbound mail items.
pub struct EmailBridge<'a> {
    db: &'a Database,
    pattern: &'a AddressPattern,
    max_payload_bytes: usize,
}

impl<'a> EmailBridge<'a> {
    /// Create a bridge for addresses matching `pattern`.
    pub fn new(db: &'a Database, pattern: &'a AddressPattern, max_payload_bytes: usize) -> Self {
        Self {
            db,
            pattern,
            max_payload_bytes,
        }
    }

    /// Store `envelope` as a pending inbound item for the addressed device.
    ///
    /// Mail for devices without an account is rejected, not stored.
    pub async fn route(&self, envelope: &InboundEnvelope) -> Result<MailItem, RouteError> {
        let device_id = self.pattern.parse(&envelope.to).map_err(|e| {
            debug!(to = %envelope.to, reason = %e, "Inbound mail does not match a device");
            RouteError::NoMatch(e)
        })?;

        if envelope.raw_body.len() > self.max_payload_bytes {
            return Err(RouteError::PayloadTooLarge(envelope.raw_body.len()));
        }

        if !AccountRepository::new(self.db.pool()).exists(&device_id).await? {
            return Err(RouteError::UnregisteredDevice(device_id));
        }

        let recipient = self.pattern.format(&device_id);
        let mut item = NewMailItem::inbound(
            device_id,
            envelope.from.clone(),
            recipient,
            envelope.raw_body.clone(),
        );
        if let Some(subject) = &envelope.subject {
            item = item.with_subject(subject.clone());
        }

        let mail = MailRepository::new(self.db.pool()).insert(&item).await?;
        info!(
            device_id = %mail.owner_device_id,
            mail_id = mail.id,
            from = %mail.sender,
            "Inbound email queued for device"
        );
        Ok(mail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::{Direction, MailState};

    async fn setup() -> (Database, AddressPattern) {
        let db = Database::open_in_memory().await.unwrap();
        (db, AddressPattern::new('w', "mail.example.com"))
    }

    async fn register(db: &Database, id: &str) -> DeviceId {
        let device = DeviceId::parse(id).unwrap();
        AccountRepository::new(db.pool())
            .create(&device, "hash")
            .await
            .unwrap();
        device
    }

    fn envelope(to: &str) -> InboundEnvelope {
        InboundEnvelope {
            from: "friend@example.org".to_string(),
            to: to.to_string(),
            subject: Some("Hi".to_string()),
            raw_body: b"Hello device".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_route_to_registered_device() {
        let (db, pattern) = setup().await;
        let device = register(&db, "1234567890123456").await;
        let bridge = EmailBridge::new(&db, &pattern, 1024);

        let mail = bridge
            .route(&envelope("w1234567890123456@mail.example.com"))
            .await
            .unwrap();
        assert_eq!(mail.owner_device_id, device);
        assert_eq!(mail.direction, Direction::Inbound);
        assert_eq!(mail.state, MailState::Pending);
        assert_eq!(mail.sender, "friend@example.org");
        assert_eq!(mail.subject.as_deref(), Some("Hi"));
        assert_eq!(mail.body, b"Hello device");

        let pending = MailRepository::new(db.pool())
            .count_pending(&device)
            .await
            .unwrap();
        assert_eq!(pending, 1);
    }

    #[tokio::test]
    async fn test_route_too_few_digits_no_match() {
        let (db, pattern) = setup().await;
        let bridge = EmailBridge::new(&db, &pattern, 1024);

        let result = bridge.route(&envelope("w123@mail.example.com")).await;
        assert!(matches!(
            result,
            Err(RouteError::NoMatch(AddressError::WrongDigitCount(3)))
        ));
    }

    #[tokio::test]
    async fn test_route_wrong_domain_no_match() {
        let (db, pattern) = setup().await;
        register(&db, "1234567890123456").await;
        let bridge = EmailBridge::new(&db, &pattern, 1024);

        let result = bridge
            .route(&envelope("w1234567890123456@elsewhere.example.com"))
            .await;
        assert!(matches!(result, Err(RouteError::NoMatch(_))));
        assert_eq!(MailRepository::new(db.pool()).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_route_unregistered_device_is_rejected() {
        let (db, pattern) = setup().await;
        let bridge = EmailBridge::new(&db, &pattern, 1024);

        let result = bridge
            .route(&envelope("w9999999999999999@mail.example.com"))
            .await;
        match result {
            Err(RouteError::UnregisteredDevice(id)) => assert_eq!(id.as_str(), "9999999999999999"),
            other => panic!("expected UnregisteredDevice, got {other:?}"),
        }
        assert_eq!(MailRepository::new(db.pool()).count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_route_payload_too_large() {
        let (db, pattern) = setup().await;
        register(&db, "1234567890123456").await;
        let bridge = EmailBridge::new(&db, &pattern, 4);

        let result = bridge
            .route(&envelope("w1234567890123456@mail.example.com"))
            .await;
        assert!(matches!(result, Err(RouteError::PayloadTooLarge(12))));
        assert!(!result.unwrap_err().is_retryable());
    }
}
