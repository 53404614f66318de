//! Configuration module for the mail gateway.

use serde::Deserialize;
use std::path::Path;

use crate::{GatewayError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Whether to serve the static site as the fallback route.
    #[serde(default)]
    pub serve_static: bool,
    /// Directory holding the static site.
    #[serde(default = "default_static_path")]
    pub static_path: String,
    /// Maximum accepted request body for config uploads and webhooks.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_path() -> String {
    "patch".to_string()
}

fn default_max_upload_bytes() -> usize {
    4 * 1024 * 1024 // 4MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            serve_static: false,
            static_path: default_static_path(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of open connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Number of connections kept open while idle.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds a request may wait for a connection before failing.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    /// Seconds a statement waits on a locked database.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_secs: u64,
}

fn default_db_path() -> String {
    "data/mailgate.db".to_string()
}

fn default_max_connections() -> u32 {
    50
}

fn default_min_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_busy_timeout() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            busy_timeout_secs: default_busy_timeout(),
        }
    }
}

/// Mail protocol configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Mail domain devices are addressed under.
    #[serde(default = "default_mail_domain")]
    pub domain: String,
    /// Character preceding the device id in a device address.
    #[serde(default = "default_address_prefix")]
    pub address_prefix: char,
    /// Minimum interval a device is told to wait between checks.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Maximum interval a device may ask for.
    #[serde(default = "default_max_check_interval")]
    pub max_check_interval_secs: u64,
    /// Maximum number of items handed out by one receive.
    #[serde(default = "default_receive_limit")]
    pub receive_limit: u32,
    /// Maximum size of a single mail payload.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    /// Hours finished items are kept before being purged.
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    /// Seconds between retention sweeps.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_mail_domain() -> String {
    "mail.example.com".to_string()
}

fn default_address_prefix() -> char {
    'w'
}

fn default_check_interval() -> u64 {
    300 // 5 minutes
}

fn default_max_check_interval() -> u64 {
    3600 // 1 hour
}

fn default_receive_limit() -> u32 {
    10
}

fn default_max_payload_bytes() -> usize {
    1024 * 1024 // 1MB
}

fn default_retention_hours() -> u64 {
    168 // 7 days
}

fn default_cleanup_interval() -> u64 {
    3600
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            domain: default_mail_domain(),
            address_prefix: default_address_prefix(),
            check_interval_secs: default_check_interval(),
            max_check_interval_secs: default_max_check_interval(),
            receive_limit: default_receive_limit(),
            max_payload_bytes: default_max_payload_bytes(),
            retention_hours: default_retention_hours(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// Client config patching configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchConfig {
    /// Scheme and host written into the client's endpoint fields.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "http://mail.example.com".to_string()
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Secret material configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretConfig {
    /// Path to the installation secret file.
    #[serde(default = "default_secret_path")]
    pub path: String,
}

fn default_secret_path() -> String {
    "config/salt.bin".to_string()
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            path: default_secret_path(),
        }
    }
}

/// Support contact configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SupportConfig {
    /// Address quoted in error messages.
    #[serde(default = "default_support_email")]
    pub email: String,
}

fn default_support_email() -> String {
    "support@example.com".to_string()
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            email: default_support_email(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/mailgate.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Mail protocol configuration.
    #[serde(default)]
    pub mail: MailConfig,
    /// Client config patching.
    #[serde(default)]
    pub patch: PatchConfig,
    /// Secret material.
    #[serde(default)]
    pub secret: SecretConfig,
    /// Support contact.
    #[serde(default)]
    pub support: SupportConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GatewayError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GatewayError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `MAILGATE_DATABASE_PATH`: Override the database file path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("MAILGATE_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.mail.domain.trim().is_empty() {
            return Err(GatewayError::Config("mail.domain must be set".to_string()));
        }
        if self.patch.base_url.trim().is_empty() {
            return Err(GatewayError::Config("patch.base_url must be set".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(GatewayError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(GatewayError::Config(
                "database.min_connections cannot exceed database.max_connections".to_string(),
            ));
        }
        if self.mail.check_interval_secs > self.mail.max_check_interval_secs {
            return Err(GatewayError::Config(
                "mail.check_interval_secs cannot exceed mail.max_check_interval_secs".to_string(),
            ));
        }
        if self.mail.receive_limit == 0 {
            return Err(GatewayError::Config(
                "mail.receive_limit must be at least 1".to_string(),
            ));
        }
        if crate::logging::level_filter(&self.logging.level).is_none() {
            return Err(GatewayError::Config(format!(
                "logging.level {:?} is not a log level",
                self.logging.level
            )));
        }
        Ok(())
    }
}
