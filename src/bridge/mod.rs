//! Inbound email bridge.
//!
//! This module provides:
//! - Device address parsing (`w<16 digits>@<domain>`)
//! - Inbound-parse webhook envelope extraction
//! - Routing of matching messages into device mailboxes

mod address;
mod envelope;
mod service;

pub use address::{AddressError, AddressPattern};
pub use envelope::{extract_address, split_addresses, EnvelopeError, InboundEnvelope, WebhookForm};
pub use service::{EmailBridge, RouteError};
