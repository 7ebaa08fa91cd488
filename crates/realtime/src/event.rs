use {axum::extract::ws::WebSocket, uuid::Uuid};

use confab_protocol::Envelope;

/// Control-plane events carried on the hub's rendezvous channel.
///
/// This is a closed sum: the loop matches exhaustively, so the "unknown
/// event is a programming error" branch of the design is enforced at
/// compile time instead of at run time.
pub(crate) enum ControlEvent {
    ConnectionRegistered { id: Uuid, socket: WebSocket },
    ConnectionUnregistered { id: Uuid },
    RoomCreated { room_id: Uuid },
    RoomJoined { conn_id: Uuid, room_id: Uuid },
}

/// Data-plane event: one frame received from a live connection.
pub(crate) struct DataEvent {
    pub sender: Uuid,
    pub frame: Envelope,
}
