//! Error types for the mail gateway.

use thiserror::Error;

/// Common error type for the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Database error.
    ///
    /// Wraps any storage failure that is not a pool timeout or a
    /// uniqueness violation.
    #[error("database error: {0}")]
    Database(String),

    /// The store could not hand out a connection in time.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Secret material could not be loaded or created.
    #[error("secret error: {0}")]
    Secret(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Whether the caller may succeed by simply retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                GatewayError::Unavailable(e.to_string())
            }
            sqlx::Error::Database(db) if is_lock_contention(db.code().as_deref()) => {
                GatewayError::Unavailable(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                GatewayError::Conflict(db.message().to_string())
            }
            _ => GatewayError::Database(e.to_string()),
        }
    }
}

/// SQLITE_BUSY or SQLITE_LOCKED, including their extended codes.
fn is_lock_contention(code: Option<&str>) -> bool {
    match code.and_then(|c| c.parse::<i32>().ok()) {
        Some(code) => matches!(code & 0xff, 5 | 6),
        None => false,
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
