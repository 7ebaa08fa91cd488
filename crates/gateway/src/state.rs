use std::{sync::Arc, time::Instant};

use confab_config::GatewayConfig;
use confab_realtime::RealtimeService;

/// Shared gateway state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub realtime: Arc<RealtimeService>,
    pub config: GatewayConfig,
    pub version: &'static str,
    pub started_at: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(realtime: Arc<RealtimeService>, config: GatewayConfig) -> Self {
        Self {
            realtime,
            config,
            version: env!("CARGO_PKG_VERSION"),
            started_at: Instant::now(),
        }
    }
}
