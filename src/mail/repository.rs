//! Mail repository.
//!
//! Every state change is a single conditional UPDATE: the `WHERE state = ...`
//! guard decides which rows move, and the affected rows are the result.
//! Concurrent callers therefore never both observe the same transition.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::types::{MailItem, NewMailItem};
use crate::account::DeviceId;
use crate::Result;

const MAIL_COLUMNS: &str = "id, owner_device_id, direction, sender, recipient, subject, body, \
                            state, created_at, delivered_at, deleted_at";

/// Repository for mail items.
pub struct MailRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MailRepository<'a> {
    /// Create a new MailRepository with the given pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new pending item.
    pub async fn insert(&self, item: &NewMailItem) -> Result<MailItem> {
        let sql = format!(
            "INSERT INTO mail_items
                 (owner_device_id, direction, sender, recipient, subject, body, state, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 'pending', ?)
             RETURNING {MAIL_COLUMNS}"
        );

        let mail = sqlx::query_as::<_, MailItem>(&sql)
            .bind(item.owner_device_id.as_str())
            .bind(item.direction.as_str())
            .bind(&item.sender)
            .bind(&item.recipient)
            .bind(&item.subject)
            .bind(&item.body)
            .bind(Utc::now())
            .fetch_one(self.pool)
            .await?;

        Ok(mail)
    }

    /// Get a mail item by id.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<MailItem>> {
        let sql = format!("SELECT {MAIL_COLUMNS} FROM mail_items WHERE id = ?");
        let mail = sqlx::query_as::<_, MailItem>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(mail)
    }

    /// Count inbound items still waiting for the device.
    pub async fn count_pending(&self, device_id: &DeviceId) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM mail_items
             WHERE owner_device_id = ? AND direction = 'inbound' AND state = 'pending'",
        )
        .bind(device_id.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(count.0)
    }

    /// Hand out up to `limit` pending inbound items, oldest first.
    ///
    /// The items are moved to `delivered` by the same statement that reads
    /// them, so an item is returned by exactly one call no matter how many
    /// run concurrently for the device.
    pub async fn fetch_pending(&self, device_id: &DeviceId, limit: u32) -> Result<Vec<MailItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "UPDATE mail_items
             SET state = 'delivered', delivered_at = ?
             WHERE state = 'pending'
               AND id IN (
                   SELECT id FROM mail_items
                   WHERE owner_device_id = ? AND direction = 'inbound' AND state = 'pending'
                   ORDER BY id
                   LIMIT ?
               )
             RETURNING {MAIL_COLUMNS}"
        );

        let mut mails = sqlx::query_as::<_, MailItem>(&sql)
            .bind(Utc::now())
            .bind(device_id.as_str())
            .bind(i64::from(limit))
            .fetch_all(self.pool)
            .await?;

        // RETURNING order is unspecified.
        mails.sort_by_key(|m| m.id);
        Ok(mails)
    }

    /// Acknowledge delivered inbound items owned by `device_id`.
    ///
    /// Ids owned by another device, still pending, or already deleted are
    /// ignored. Returns the number of items that moved to `deleted`.
    pub async fn mark_deleted(&self, device_id: &DeviceId, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE mail_items SET state = 'deleted', deleted_at = ");
        query.push_bind(Utc::now());
        query.push(" WHERE owner_device_id = ");
        query.push_bind(device_id.as_str());
        query.push(" AND direction = 'inbound' AND state = 'delivered' AND id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = query.build().execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    /// List outbound items waiting for the relay, oldest first.
    pub async fn list_outbound_pending(&self, limit: u32) -> Result<Vec<MailItem>> {
        let sql = format!(
            "SELECT {MAIL_COLUMNS} FROM mail_items
             WHERE direction = 'outbound' AND state = 'pending'
             ORDER BY id
             LIMIT ?"
        );
        let mails = sqlx::query_as::<_, MailItem>(&sql)
            .bind(i64::from(limit))
            .fetch_all(self.pool)
            .await?;
        Ok(mails)
    }

    /// Record that the relay has sent the given outbound items.
    ///
    /// Only pending outbound items move; returns how many did.
    pub async fn mark_relayed(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE mail_items SET state = 'delivered', delivered_at = ");
        query.push_bind(Utc::now());
        query.push(" WHERE direction = 'outbound' AND state = 'pending' AND id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = query.build().execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Physically remove finished items older than `cutoff`.
    ///
    /// Finished means acknowledged by the device, or outbound and already
    /// handed to the relay.
    pub async fn purge_finished(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM mail_items
             WHERE (state = 'deleted' AND deleted_at < ?)
                OR (direction = 'outbound' AND state = 'delivered' AND delivered_at < ?)",
        )
        .bind(cutoff)
        .bind(cutoff)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Count all stored items.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mail_items")
            .fetch_one(self.pool)
            .await?;
        Ok(count.0)
    }
}
