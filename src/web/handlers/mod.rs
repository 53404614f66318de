//! HTTP handlers.

pub mod account;
pub mod inbound;
pub mod mail;
pub mod patch;

pub use account::account;
pub use inbound::sendgrid_parse;
pub use mail::{check, delete, receive, send};
pub use patch::{patch_info, upload_config};

use std::sync::Arc;

use crate::account::AccountRegistry;
use crate::bridge::{AddressPattern, EmailBridge};
use crate::config::Config;
use crate::db::Database;
use crate::mail::ProtocolDispatcher;
use crate::patcher::ConfigPatcher;
use crate::secret::SecretStore;
use crate::web::error::ApiError;

/// Shared application state, built once at startup.
pub struct AppState {
    /// Database pool.
    pub db: Arc<Database>,
    /// Installation secret.
    pub secret: Arc<SecretStore>,
    /// Process configuration.
    pub config: Config,
    /// Device address pattern for the configured mail domain.
    pub pattern: AddressPattern,
    /// Client configuration patcher.
    pub patcher: ConfigPatcher,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Arc<Database>, secret: Arc<SecretStore>, config: Config) -> Self {
        let pattern = AddressPattern::new(config.mail.address_prefix, config.mail.domain.clone());
        let patcher = ConfigPatcher::nwc24(&config.patch.base_url, &config.mail.domain);
        Self {
            db,
            secret,
            config,
            pattern,
            patcher,
        }
    }

    /// Account registry over the shared store.
    pub fn registry(&self) -> AccountRegistry<'_> {
        AccountRegistry::new(&self.db, &self.secret)
    }

    /// Protocol dispatcher over the shared store.
    pub fn dispatcher(&self) -> ProtocolDispatcher<'_> {
        ProtocolDispatcher::new(&self.db, &self.secret, &self.config.mail, &self.pattern)
    }

    /// Email bridge over the shared store.
    pub fn bridge(&self) -> EmailBridge<'_> {
        EmailBridge::new(&self.db, &self.pattern, self.config.mail.max_payload_bytes)
    }

    /// Convert an error into a device response naming the support contact.
    pub fn reject(&self, err: impl Into<ApiError>) -> ApiError {
        err.into().with_support(&self.config.support.email)
    }
}

/// Shared state handle used by the router.
pub type SharedState = Arc<AppState>;
