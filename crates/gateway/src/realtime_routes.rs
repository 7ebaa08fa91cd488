use {
    axum::{
        Json, Router,
        extract::{Path, State, WebSocketUpgrade},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
    },
    serde::Deserialize,
    tracing::info,
    uuid::Uuid,
};

use confab_realtime::Room;

use crate::{error::ApiError, state::AppState};

/// Routes nested under `/realtime`.
pub fn realtime_router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws_upgrade_handler))
        .route("/room", post(create_room_handler).get(list_rooms_handler))
        .route("/room/by-name/{name}", get(room_by_name_handler))
        .route("/room/{room_id}/join", post(join_room_handler))
}

// ── WebSocket upgrade ────────────────────────────────────────────────────────

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // Oversized frames must fail the read, not get buffered.
    let max_frame = state.realtime.tuning().max_frame_bytes;
    ws.max_message_size(max_frame).on_upgrade(move |socket| async move {
        let conn_id = state.realtime.connect(socket).await;
        info!(conn_id = %conn_id, "websocket connection established");
    })
}

// ── Room REST ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateRoomRequest {
    name: String,
}

async fn create_room_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::ValidationFailed("room name must not be empty".into()));
    }
    let room: Room = state.realtime.create_room(name).await;
    Ok((StatusCode::CREATED, Json(room)))
}

async fn list_rooms_handler(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = state.realtime.list_rooms().await;
    Json(serde_json::json!({ "rooms": rooms }))
}

async fn room_by_name_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Room>, ApiError> {
    state
        .realtime
        .get_room_by_name(&name)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no room named {name:?}")))
}

#[derive(Debug, Deserialize)]
struct JoinRoomRequest {
    connection_id: String,
}

/// Fire-and-forget join: the hub logs failures (unknown room or connection)
/// instead of reporting them back, so all we can promise is acceptance.
async fn join_room_handler(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<JoinRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let room_id = parse_id(&room_id, "room_id")?;
    let conn_id = parse_id(&body.connection_id, "connection_id")?;
    state.realtime.join_room(conn_id, room_id).await;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "accepted" })),
    ))
}

fn parse_id(raw: &str, field: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId(format!("{field} is not a valid UUID")))
}
