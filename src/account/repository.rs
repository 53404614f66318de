//! Account repository.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::device_id::DeviceId;
use crate::Result;

/// A registered device account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    /// Device identity (primary key).
    #[sqlx(try_from = "String")]
    pub device_id: DeviceId,
    /// Argon2 PHC hash of the device credential.
    pub credential_hash: String,
    /// When the account was registered.
    pub created_at: DateTime<Utc>,
}

/// Repository for account rows.
pub struct AccountRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new AccountRepository with the given pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new account.
    ///
    /// Fails with [`crate::GatewayError::Conflict`] if the device id is taken.
    pub async fn create(&self, device_id: &DeviceId, credential_hash: &str) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (device_id, credential_hash, created_at)
             VALUES (?, ?, ?)
             RETURNING device_id, credential_hash, created_at",
        )
        .bind(device_id.as_str())
        .bind(credential_hash)
        .bind(Utc::now())
        .fetch_one(self.pool)
        .await?;

        Ok(account)
    }

    /// Get an account by device id.
    pub async fn get(&self, device_id: &DeviceId) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT device_id, credential_hash, created_at FROM accounts WHERE device_id = ?",
        )
        .bind(device_id.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(account)
    }

    /// Check whether an account exists.
    pub async fn exists(&self, device_id: &DeviceId) -> Result<bool> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM accounts WHERE device_id = ?)")
                .bind(device_id.as_str())
                .fetch_one(self.pool)
                .await?;
        Ok(exists.0)
    }

    /// Count all accounts.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(self.pool)
            .await?;
        Ok(count.0)
    }
}
