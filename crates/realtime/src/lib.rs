//! The realtime fan-out core: a single-writer hub event loop that owns the
//! authoritative connection and room maps, per-connection reader/writer task
//! pairs, and the service façade other subsystems call.
//!
//! Concurrency contract: the hub loop is the only task that reads or writes
//! the connection and room maps. Readers and writers communicate with it
//! exclusively through channels; the `connection` and `event` modules are
//! crate-private so nothing outside this crate can reach the maps.

mod connection;
mod event;

pub mod hub;
pub mod room;
pub mod service;
pub mod tuning;

pub use {
    hub::{Hub, HubHandle},
    room::Room,
    service::RealtimeService,
    tuning::Tuning,
};
