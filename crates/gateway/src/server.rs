use std::sync::Arc;

use {
    axum::{Json, Router, extract::State, response::IntoResponse, routing::get},
    tokio::net::TcpListener,
    tower_http::trace::TraceLayer,
    tracing::info,
};

use crate::{realtime_routes::realtime_router, state::AppState};

/// Build the gateway router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/realtime", realtime_router());

    let router = if state.config.request_logs {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

/// Serve until `shutdown` resolves. The hub is cancelled before the HTTP
/// server stops accepting, so writers get to send close frames while the
/// listener drains.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let realtime = Arc::clone(&state.realtime);
    let app = build_app(state);
    info!(addr = %listener.local_addr()?, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("shutdown signal received");
            realtime.shutdown();
        })
        .await
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    if !state.config.detailed_health {
        return Json(serde_json::json!({ "status": "ok" }));
    }
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "environment": state.config.environment,
        "connections": state.realtime.connection_count(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}
