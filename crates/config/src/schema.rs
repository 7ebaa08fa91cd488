//! Config schema types (gateway listener, realtime hub tuning).

use serde::{Deserialize, Serialize};

/// Top-level config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfabConfig {
    pub gateway: GatewayConfig,
    pub realtime: RealtimeConfig,
}

/// HTTP/WS listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Deployment environment label, reported by the health endpoint.
    pub environment: String,
    /// Report uptime and connection counts from `/health` instead of a bare
    /// status line.
    pub detailed_health: bool,
    /// Emit per-request trace logs.
    pub request_logs: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            environment: "production".into(),
            detailed_health: true,
            request_logs: true,
        }
    }
}

/// Tuning knobs for the realtime hub. Defaults come from the wire protocol
/// constants; overriding them is only needed for load testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Capacity of the hub's data-plane events channel.
    pub events_capacity: usize,
    /// Capacity of each connection's outgoing frame queue.
    pub outgoing_capacity: usize,
    /// Seconds a connection may go without a pong before it is torn down.
    pub pong_wait_secs: u64,
    /// Seconds allowed for a single socket write.
    pub write_timeout_secs: u64,
    /// Maximum inbound frame size in bytes.
    pub max_frame_bytes: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            events_capacity: confab_protocol::EVENTS_CAPACITY,
            outgoing_capacity: confab_protocol::OUTGOING_CAPACITY,
            pong_wait_secs: confab_protocol::PONG_WAIT.as_secs(),
            write_timeout_secs: confab_protocol::WRITE_TIMEOUT.as_secs(),
            max_frame_bytes: confab_protocol::MAX_FRAME_BYTES,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let cfg = ConfabConfig::default();
        assert_eq!(cfg.gateway.port, 8000);
        assert_eq!(cfg.realtime.events_capacity, 100);
        assert_eq!(cfg.realtime.outgoing_capacity, 100);
        assert_eq!(cfg.realtime.pong_wait_secs, 60);
        assert_eq!(cfg.realtime.write_timeout_secs, 15);
        assert_eq!(cfg.realtime.max_frame_bytes, 4096);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: ConfabConfig = toml::from_str(
            r#"
            [gateway]
            port = 9100

            [realtime]
            pong_wait_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.gateway.port, 9100);
        assert_eq!(cfg.gateway.host, "127.0.0.1");
        assert_eq!(cfg.realtime.pong_wait_secs, 30);
        assert_eq!(cfg.realtime.max_frame_bytes, 4096);
    }
}
