//! REST API server for the peer-to-peer loan lifecycle
//!
//! Exposes loan creation, approval, investment, disbursement and lookup over HTTP,
//! wires the lifecycle engine to the mock mailer, the event channel and the audit
//! trail, and runs the event consumer alongside the server.

pub mod app;
pub mod config;
pub mod routes;
pub mod server;

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
