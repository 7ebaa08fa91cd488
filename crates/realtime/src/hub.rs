use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use {
    axum::extract::ws::WebSocket,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
    uuid::Uuid,
};

use confab_protocol::{ChatPayload, Envelope, frame_types};

use crate::{
    connection::{self, ConnectionHandle},
    event::{ControlEvent, DataEvent},
    room::RoomState,
    tuning::Tuning,
};

// ── Hub ──────────────────────────────────────────────────────────────────────

/// The single-writer event loop state. Owns the authoritative connection and
/// room maps; nothing outside [`Hub::run`] ever touches them.
///
/// Two inbound channels feed the loop: a buffered data-plane channel for
/// frames received from connections, and a rendezvous-like control channel
/// (capacity 1, the closest `tokio::sync::mpsc` gets to an unbuffered
/// channel) for lifecycle events, so control submitters block until the
/// loop accepts their event.
pub struct Hub {
    connections: HashMap<Uuid, ConnectionHandle>,
    rooms: HashMap<Uuid, RoomState>,
    events_rx: mpsc::Receiver<DataEvent>,
    control_rx: mpsc::Receiver<ControlEvent>,
    events_tx: mpsc::Sender<DataEvent>,
    handle: HubHandle,
}

impl Hub {
    #[must_use]
    pub fn new(tuning: Tuning) -> Self {
        let (events_tx, events_rx) = mpsc::channel(tuning.events_capacity);
        let (control_tx, control_rx) = mpsc::channel(1);
        let handle = HubHandle {
            control: control_tx,
            cancel: CancellationToken::new(),
            live_connections: Arc::new(AtomicUsize::new(0)),
            tuning,
        };
        Self {
            connections: HashMap::new(),
            rooms: HashMap::new(),
            events_rx,
            control_rx,
            events_tx,
            handle,
        }
    }

    /// A cheap handle for submitting events from other tasks.
    #[must_use]
    pub fn handle(&self) -> HubHandle {
        self.handle.clone()
    }

    /// The event loop. Processes exactly one event to completion per
    /// iteration; data and control events are multiplexed onto the same
    /// task, so heavy data load can delay control events (known limitation).
    pub async fn run(mut self) {
        info!("hub event loop started");
        loop {
            tokio::select! {
                () = self.handle.cancel.cancelled() => {
                    self.drain();
                    break;
                }
                Some(event) = self.control_rx.recv() => self.handle_control(event),
                Some(event) = self.events_rx.recv() => self.handle_data(event),
                else => break,
            }
        }
        info!("hub event loop stopped");
    }

    // ── Control plane ────────────────────────────────────────────────────

    fn handle_control(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::ConnectionRegistered { id, socket } => self.register(id, socket),
            ControlEvent::ConnectionUnregistered { id } => self.unregister(id),
            ControlEvent::RoomCreated { room_id } => self.create_room(room_id),
            ControlEvent::RoomJoined { conn_id, room_id } => self.join_room(conn_id, room_id),
        }
    }

    fn register(&mut self, id: Uuid, socket: WebSocket) {
        let (conn, outgoing_rx) = ConnectionHandle::new(self.handle.tuning.outgoing_capacity);

        // A fresh queue always has room for the welcome frame; if that ever
        // stops holding we want to hear about it, not crash.
        if conn.outgoing.try_send(Envelope::welcome(id)).is_err() {
            warn!(conn_id = %id, "could not queue welcome frame");
        }

        connection::spawn_io(
            id,
            socket,
            outgoing_rx,
            self.events_tx.clone(),
            self.handle.control.clone(),
            self.handle.tuning,
        );

        self.connections.insert(id, conn);
        self.publish_connection_count();
        info!(conn_id = %id, "connection registered");
    }

    fn unregister(&mut self, id: Uuid) {
        let Some(conn) = self.connections.remove(&id) else {
            warn!(conn_id = %id, "unregister for unknown connection");
            return;
        };
        self.publish_connection_count();

        let ConnectionHandle {
            outgoing,
            joined,
            connected_at,
        } = conn;
        // Dropping the sender closes the outgoing queue exactly once; the
        // writer drains what was already queued, answers with a close frame,
        // and exits.
        drop(outgoing);

        for room_id in &joined {
            // Rooms are never deleted today, but membership cleanup must not
            // assume that.
            if let Some(room) = self.rooms.get_mut(room_id) {
                room.members.remove(&id);
            }
        }

        info!(
            conn_id = %id,
            connected_at = %connected_at,
            rooms = joined.len(),
            "connection unregistered"
        );
    }

    fn create_room(&mut self, room_id: Uuid) {
        if self.rooms.contains_key(&room_id) {
            debug!(room_id = %room_id, "room already exists");
            return;
        }
        self.rooms.insert(room_id, RoomState::new(room_id));
        info!(room_id = %room_id, "room created");
    }

    fn join_room(&mut self, conn_id: Uuid, room_id: Uuid) {
        let Some(room) = self.rooms.get_mut(&room_id) else {
            warn!(conn_id = %conn_id, room_id = %room_id, "join for unknown room");
            return;
        };
        let Some(conn) = self.connections.get_mut(&conn_id) else {
            warn!(conn_id = %conn_id, room_id = %room_id, "join for unknown connection");
            return;
        };
        if !room.members.insert(conn_id) {
            warn!(conn_id = %conn_id, room_id = %room_id, "already a room member");
            return;
        }
        conn.joined.insert(room_id);
        info!(conn_id = %conn_id, room_id = %room_id, members = room.members.len(), "joined room");
    }

    // ── Data plane ───────────────────────────────────────────────────────

    fn handle_data(&mut self, event: DataEvent) {
        let DataEvent { sender, frame } = event;
        match frame.r#type.as_str() {
            frame_types::CHAT_MESSAGE => self.fan_out_chat(sender, frame.payload),
            other => {
                warn!(conn_id = %sender, frame_type = other, "dropping frame of unknown type");
            },
        }
    }

    /// Fan a chat frame out to every room member except the sender. Sends to
    /// recipients are non-blocking: a full queue drops the frame for that
    /// recipient only. Membership entries pointing at connections that no
    /// longer exist are pruned along the way.
    fn fan_out_chat(&mut self, sender: Uuid, payload: serde_json::Value) {
        let payload: ChatPayload = match serde_json::from_value(payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(conn_id = %sender, error = %e, "dropping chat frame with bad payload");
                return;
            },
        };
        let Some(room) = self.rooms.get_mut(&payload.room_id) else {
            warn!(conn_id = %sender, room_id = %payload.room_id, "dropping chat frame for unknown room");
            return;
        };

        let frame = Envelope::chat_message(payload.room_id, &payload.message);
        let mut stale = Vec::new();
        for &member in &room.members {
            if member == sender {
                continue;
            }
            let Some(conn) = self.connections.get(&member) else {
                stale.push(member);
                continue;
            };
            match conn.outgoing.try_send(frame.clone()) {
                Ok(()) => debug!(from = %sender, to = %member, room_id = %room.id, "frame fanned out"),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(from = %sender, to = %member, "outgoing queue full, dropping frame");
                },
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(from = %sender, to = %member, "outgoing queue closed, dropping frame");
                },
            }
        }

        for member in stale {
            room.members.remove(&member);
            warn!(room_id = %room.id, conn_id = %member, "pruned stale room member");
        }
    }

    // ── Shutdown ─────────────────────────────────────────────────────────

    /// Close every connection's outgoing queue and clear the maps. Writers
    /// observe the queue close, send close frames, and exit; readers follow
    /// when their sockets die.
    fn drain(&mut self) {
        info!(connections = self.connections.len(), "hub shutting down");
        self.rooms.clear();
        self.connections.clear();
        self.publish_connection_count();
    }

    fn publish_connection_count(&self) {
        self.handle
            .live_connections
            .store(self.connections.len(), Ordering::Relaxed);
    }
}

// ── Handle ───────────────────────────────────────────────────────────────────

/// Submits events to the hub loop from other tasks. Cloneable and cheap.
#[derive(Clone)]
pub struct HubHandle {
    control: mpsc::Sender<ControlEvent>,
    cancel: CancellationToken,
    live_connections: Arc<AtomicUsize>,
    tuning: Tuning,
}

impl HubHandle {
    /// Hand a freshly upgraded socket to the hub. Generates the connection
    /// id and blocks until the loop accepts the registration event.
    pub async fn submit_connection(&self, socket: WebSocket) -> Uuid {
        let id = Uuid::new_v4();
        if self
            .control
            .send(ControlEvent::ConnectionRegistered { id, socket })
            .await
            .is_err()
        {
            error!(conn_id = %id, "hub is not running, dropping connection");
        }
        id
    }

    pub async fn submit_room_created(&self, room_id: Uuid) {
        if self
            .control
            .send(ControlEvent::RoomCreated { room_id })
            .await
            .is_err()
        {
            error!(room_id = %room_id, "hub is not running, dropping room-created event");
        }
    }

    /// Fire-and-forget: failures inside the loop (unknown room, unknown
    /// connection) are logged, not reported back.
    pub async fn submit_room_joined(&self, conn_id: Uuid, room_id: Uuid) {
        if self
            .control
            .send(ControlEvent::RoomJoined { conn_id, room_id })
            .await
            .is_err()
        {
            error!(conn_id = %conn_id, room_id = %room_id, "hub is not running, dropping join event");
        }
    }

    /// Ask the loop to close all connections and exit.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Number of live connections, maintained by the loop.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.live_connections.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn tuning(&self) -> Tuning {
        self.tuning
    }
}
