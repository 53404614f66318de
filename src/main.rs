use std::process::ExitCode;

use tracing::{error, info};

use mailgate::{Config, Database, GatewayServer, SecretStore};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path).and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = mailgate::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        mailgate::logging::init_console_only(&config.logging.level);
    }

    info!("mailgate starting");

    let secret = match SecretStore::load_or_create(&config.secret.path) {
        Ok(secret) => secret,
        Err(e) => {
            error!("Cannot initialize installation secret: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let db = match Database::open(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            error!("Cannot open database {}: {}", config.database.path, e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        domain = %config.mail.domain,
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    let server = match GatewayServer::new(config, db, secret) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
