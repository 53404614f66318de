//! Tracing setup for the gateway process.
//!
//! `RUST_LOG` overrides the configured level when set. Console output keeps
//! colours; the log file never does.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::{GatewayError, Result};

/// Parse a configured level name (`trace` .. `error`, or `off`).
pub fn level_filter(level: &str) -> Option<LevelFilter> {
    level.trim().parse().ok()
}

fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Open `path` for appending, creating parent directories as needed.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Log to the console and to the configured file.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = level_filter(&config.level)
        .ok_or_else(|| GatewayError::Config(format!("unknown log level {:?}", config.level)))?;
    let file = open_log_file(Path::new(&config.file))?;

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        .try_init()
        .map_err(|e| GatewayError::Config(format!("logging already initialized: {e}")))
}

/// Log to the console only. Unknown levels fall back to `info`.
pub fn init_console_only(level: &str) {
    let level = level_filter(level).unwrap_or(LevelFilter::INFO);
    // A subscriber that is already installed keeps working.
    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt::layer().with_target(false))
        .try_init();
}
