use std::time::Duration;

/// Liveness and capacity knobs for the hub and its connections.
///
/// Defaults mirror the wire protocol constants; the config surface can
/// override them for load testing.
#[derive(Debug, Clone, Copy)]
pub struct Tuning {
    /// Capacity of the hub's buffered data-plane channel.
    pub events_capacity: usize,
    /// Capacity of each connection's outgoing frame queue.
    pub outgoing_capacity: usize,
    /// How long a connection may go without answering a ping.
    pub pong_wait: Duration,
    /// Upper bound on a single socket write.
    pub write_timeout: Duration,
    /// Maximum inbound frame size, enforced at the WebSocket upgrade.
    pub max_frame_bytes: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            events_capacity: confab_protocol::EVENTS_CAPACITY,
            outgoing_capacity: confab_protocol::OUTGOING_CAPACITY,
            pong_wait: confab_protocol::PONG_WAIT,
            write_timeout: confab_protocol::WRITE_TIMEOUT,
            max_frame_bytes: confab_protocol::MAX_FRAME_BYTES,
        }
    }
}

impl Tuning {
    /// Pings go out at 9/10 of the pong wait so a healthy peer always has a
    /// ping in flight before its deadline.
    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        confab_protocol::ping_interval(self.pong_wait)
    }
}
