//! Gateway HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::Utc;
use tokio::net::TcpListener;

use super::handlers::AppState;
use super::router::{create_health_router, create_router, create_static_router};
use crate::config::{Config, MailConfig};
use crate::db::Database;
use crate::mail::MailRepository;
use crate::secret::SecretStore;
use crate::{GatewayError, Result};

// Keeps the cutoff computation inside chrono's range.
const MAX_RETENTION_HOURS: u64 = 24 * 365 * 100;

/// HTTP server for devices, config uploads and the inbound webhook.
pub struct GatewayServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    state: Arc<AppState>,
}

impl GatewayServer {
    /// Create a new server from fully initialized components.
    pub fn new(config: Config, db: Database, secret: SecretStore) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| GatewayError::Config(format!("invalid server address: {e}")))?;

        Ok(Self {
            addr,
            state: Arc::new(AppState::new(Arc::new(db), Arc::new(secret), config)),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared application state.
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the complete router.
    pub fn router(&self) -> Router {
        let server = &self.state.config.server;
        let mut router = create_router(self.state.clone()).merge(create_health_router());

        if server.serve_static {
            if let Some(static_router) = create_static_router(&server.static_path) {
                router = router.merge(static_router);
            }
        }
        router
    }

    /// Start the retention background task.
    ///
    /// Removes acknowledged mail and relayed outbound mail older than the
    /// retention window.
    fn start_retention_task(db: Arc<Database>, config: MailConfig) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(config.cleanup_interval_secs.max(1)));
            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                let hours = config.retention_hours.min(MAX_RETENTION_HOURS) as i64;
                let cutoff = Utc::now() - chrono::Duration::hours(hours);
                match MailRepository::new(db.pool()).purge_finished(cutoff).await {
                    Ok(count) if count > 0 => {
                        tracing::info!(deleted_count = count, "Purged finished mail");
                    }
                    Ok(_) => tracing::debug!("No finished mail to purge"),
                    Err(e) => tracing::warn!(error = %e, "Failed to purge finished mail"),
                }
            }
        });
    }

    async fn bind(&self) -> std::io::Result<(TcpListener, Router)> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        // Start retention task after successful bind
        Self::start_retention_task(self.state.db.clone(), self.state.config.mail.clone());
        tracing::info!(
            every_secs = self.state.config.mail.cleanup_interval_secs,
            "Retention task started"
        );
        tracing::info!("Gateway listening on http://{}", local_addr);

        Ok((listener, router))
    }

    /// Run the server until it fails.
    pub async fn run(self) -> std::io::Result<()> {
        let (listener, router) = self.bind().await?;
        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let (listener, router) = self.bind().await?;
        let local_addr = listener.local_addr()?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Gateway server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn create_test_config() -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config
    }

    #[tokio::test]
    async fn test_gateway_server_new() {
        let db = Database::open_in_memory().await.unwrap();
        let server = GatewayServer::new(create_test_config(), db, SecretStore::ephemeral()).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_gateway_server_invalid_addr() {
        let mut config = create_test_config();
        config.server.host = "not an address".to_string();
        let db = Database::open_in_memory().await.unwrap();
        assert!(matches!(
            GatewayServer::new(config, db, SecretStore::ephemeral()),
            Err(GatewayError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_gateway_server_run() {
        let db = Database::open_in_memory().await.unwrap();
        let server = GatewayServer::new(create_test_config(), db, SecretStore::ephemeral()).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("OK"));
    }
}
