//! HTTP interface.
//!
//! Device protocol endpoints under `/cgi-bin`, the config upload page and
//! the inbound-email webhook.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod server;

pub use error::{ApiError, ResultCode};
pub use handlers::AppState;
pub use router::create_router;
pub use server::GatewayServer;
