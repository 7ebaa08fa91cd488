//! Realtime wire protocol definitions.
//!
//! All communication uses JSON text frames over WebSocket. Every frame is an
//! [`Envelope`] — `{"type": <string>, "payload": <JSON value>}` — where the
//! payload is opaque to the codec and interpreted downstream based on `type`.
//!
//! Frame types:
//! - `welcome`      — server → client, sent once on registration
//! - `chat_message` — either direction, fanned out to room members

use {
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

// ── Constants ────────────────────────────────────────────────────────────────

/// Frames larger than this are rejected at the socket layer.
pub const MAX_FRAME_BYTES: usize = 4096;
/// A connection that has not answered a ping within this window is dead.
pub const PONG_WAIT: std::time::Duration = std::time::Duration::from_secs(60);
/// Upper bound on a single socket write.
pub const WRITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);
/// Capacity of the hub's buffered data-plane channel.
pub const EVENTS_CAPACITY: usize = 100;
/// Capacity of each connection's outgoing frame queue.
pub const OUTGOING_CAPACITY: usize = 100;

/// Pings must go out strictly before the pong deadline elapses.
#[must_use]
pub fn ping_interval(pong_wait: std::time::Duration) -> std::time::Duration {
    pong_wait * 9 / 10
}

// ── Frame types ──────────────────────────────────────────────────────────────

pub mod frame_types {
    pub const WELCOME: &str = "welcome";
    pub const CHAT_MESSAGE: &str = "chat_message";
}

// ── Envelope ─────────────────────────────────────────────────────────────────

/// The wire envelope. The payload is carried verbatim; only `type` is
/// inspected when routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub r#type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Parse a text frame into an envelope without touching the payload.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// The `welcome` frame carrying the connection's identifier.
    #[must_use]
    pub fn welcome(conn_id: Uuid) -> Self {
        Self {
            r#type: frame_types::WELCOME.into(),
            payload: serde_json::json!({ "id": conn_id }),
        }
    }

    /// A fresh `chat_message` frame for fan-out to a room member.
    #[must_use]
    pub fn chat_message(room_id: Uuid, message: &str) -> Self {
        Self {
            r#type: frame_types::CHAT_MESSAGE.into(),
            payload: serde_json::json!({ "room_id": room_id, "message": message }),
        }
    }
}

// ── Payloads ─────────────────────────────────────────────────────────────────

/// Payload of the `welcome` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomePayload {
    pub id: Uuid,
}

/// Payload of a `chat_message` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPayload {
    pub room_id: Uuid,
    pub message: String,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn envelope_round_trips_with_opaque_payload() {
        let text = r#"{"type":"custom","payload":{"nested":{"k":[1,2,3]}}}"#;
        let env = Envelope::parse(text).unwrap();
        assert_eq!(env.r#type, "custom");
        // Payload survives untouched.
        assert_eq!(env.payload["nested"]["k"][2], 3);
        let back = Envelope::parse(&env.to_json().unwrap()).unwrap();
        assert_eq!(back.payload, env.payload);
    }

    #[test]
    fn envelope_without_payload_defaults_to_null() {
        let env = Envelope::parse(r#"{"type":"welcome"}"#).unwrap();
        assert!(env.payload.is_null());
    }

    #[test]
    fn malformed_envelope_is_rejected() {
        assert!(Envelope::parse("not json").is_err());
        assert!(Envelope::parse(r#"{"payload":{}}"#).is_err());
    }

    #[test]
    fn welcome_frame_shape() {
        let id = Uuid::new_v4();
        let env = Envelope::welcome(id);
        let payload: WelcomePayload = serde_json::from_value(env.payload).unwrap();
        assert_eq!(payload.id, id);
        assert_eq!(env.r#type, frame_types::WELCOME);
    }

    #[test]
    fn chat_frame_shape() {
        let room = Uuid::new_v4();
        let env = Envelope::chat_message(room, "hi");
        let payload: ChatPayload = serde_json::from_value(env.payload).unwrap();
        assert_eq!(payload.room_id, room);
        assert_eq!(payload.message, "hi");
    }

    #[test]
    fn ping_fires_before_pong_deadline() {
        let interval = ping_interval(PONG_WAIT);
        assert_eq!(interval, std::time::Duration::from_secs(54));
        assert!(interval < PONG_WAIT);
    }
}
