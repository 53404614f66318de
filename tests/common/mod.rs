//! Test helpers for gateway integration tests.
//!
//! Provides a router-backed TestServer and helpers for speaking the device
//! protocol.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum_test::TestServer;
use mailgate::config::Config;
use mailgate::patcher::nwc24;
use mailgate::web::{create_router, AppState};
use mailgate::{Database, SecretStore};

pub const DOMAIN: &str = "mail.example.com";
pub const SUPPORT_EMAIL: &str = "support@example.com";

/// Create a test configuration.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.mail.domain = DOMAIN.to_string();
    config.mail.receive_limit = 5;
    config.patch.base_url = "http://gateway.example.com".to_string();
    config.support.email = SUPPORT_EMAIL.to_string();
    config
}

/// Create a test server over the given database.
pub fn create_test_server_with(db: Arc<Database>, config: Config) -> (TestServer, Arc<AppState>) {
    let secret = Arc::new(SecretStore::from_bytes(vec![9u8; 128]).expect("secret"));
    let state = Arc::new(AppState::new(db, secret, config));
    let router = create_router(state.clone());
    let server = TestServer::new(router).expect("Failed to create test server");
    (server, state)
}

/// Create a test server with an in-memory database.
pub async fn create_test_server() -> (TestServer, Arc<AppState>) {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    create_test_server_with(Arc::new(db), create_test_config())
}

/// Parse a `key=value` device response.
pub fn parse_lines(body: &str) -> HashMap<String, String> {
    body.lines()
        .filter_map(|line| line.trim_end_matches('\r').split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Register a device through the account endpoint.
pub async fn register_device(server: &TestServer, mlid: &str, passwd: &str) {
    let response = server
        .post("/cgi-bin/account.cgi")
        .form(&[("mlid", mlid), ("passwd", passwd)])
        .await;
    response.assert_status_ok();
}

/// The device address for a bare 16-digit id.
pub fn address(id: &str) -> String {
    format!("w{id}@{DOMAIN}")
}

/// A well-formed client configuration with recognisable filler bytes.
pub fn sample_config_blob() -> Vec<u8> {
    let mut blob: Vec<u8> = (0..nwc24::CONFIG_LENGTH)
        .map(|i| (i % 200) as u8 + 1)
        .collect();
    blob[..4].copy_from_slice(nwc24::MAGIC);
    blob
}
