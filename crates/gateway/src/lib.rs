//! Gateway: the HTTP/WebSocket surface in front of the realtime core.
//!
//! Lifecycle:
//! 1. Load config, build the realtime service, start the hub event loop
//! 2. Bind the listener and build the router (health, room REST, WS upgrade)
//! 3. Serve until the shutdown signal fires, then cancel the hub first
//!
//! Fan-out logic lives in `confab-realtime`; this crate only translates HTTP
//! and upgrade requests into façade calls.

pub mod error;
pub mod realtime_routes;
pub mod server;
pub mod state;
