//! mailgate - device mail gateway
//!
//! Lets fixed-function network clients exchange mail through a shared
//! store, hands them patched client configuration, and bridges inbound
//! email into their mailboxes.

pub mod account;
pub mod bridge;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mail;
pub mod patcher;
pub mod secret;
pub mod web;

pub use account::{Account, AccountError, AccountRegistry, DeviceId};
pub use bridge::{AddressPattern, EmailBridge, InboundEnvelope, RouteError};
pub use config::Config;
pub use db::Database;
pub use error::{GatewayError, Result};
pub use mail::{
    CheckResult, DispatchError, MailItem, MailRepository, MailState, ProtocolDispatcher,
    SendRequest,
};
pub use patcher::{ConfigPatcher, PatchError};
pub use secret::SecretStore;
pub use web::GatewayServer;
