use std::{collections::HashMap, sync::Arc};

use {
    axum::extract::ws::WebSocket,
    tokio::sync::RwLock,
    tracing::{info, warn},
    uuid::Uuid,
};

use crate::{
    hub::{Hub, HubHandle},
    room::Room,
    tuning::Tuning,
};

/// External-facing façade over the hub: room bookkeeping by name plus event
/// submission. HTTP handlers call this from many tasks concurrently, so the
/// name index sits behind a lock; membership itself lives in the hub.
pub struct RealtimeService {
    /// Room name → descriptor index.
    rooms: RwLock<HashMap<String, Room>>,
    hub: HubHandle,
    /// The not-yet-started loop state, consumed by `start_event_loop`.
    event_loop: std::sync::Mutex<Option<Hub>>,
}

impl RealtimeService {
    #[must_use]
    pub fn new(tuning: Tuning) -> Arc<Self> {
        let hub = Hub::new(tuning);
        let handle = hub.handle();
        info!("created realtime service");
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
            hub: handle,
            event_loop: std::sync::Mutex::new(Some(hub)),
        })
    }

    /// Launch the hub's event loop on a background task. Expected to be
    /// called exactly once; later calls are a warned no-op.
    pub fn start_event_loop(&self) {
        let hub = {
            let mut slot = match self.event_loop.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            slot.take()
        };
        match hub {
            Some(hub) => {
                tokio::spawn(hub.run());
            },
            None => warn!("hub event loop already started"),
        }
    }

    /// Create a room, idempotent by name: creating twice returns the same
    /// room. New rooms are announced to the hub before the lock is released,
    /// so a join using the returned id cannot outrun the room's creation
    /// from the same task.
    pub async fn create_room(&self, name: &str) -> Room {
        let mut rooms = self.rooms.write().await;
        if let Some(existing) = rooms.get(name) {
            return existing.clone();
        }
        let room = Room {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        rooms.insert(name.to_string(), room.clone());
        self.hub.submit_room_created(room.id).await;
        info!(room_id = %room.id, name = %room.name, "room created");
        room
    }

    pub async fn get_room_by_name(&self, name: &str) -> Option<Room> {
        self.rooms.read().await.get(name).cloned()
    }

    /// Snapshot of all rooms; iteration order is unspecified.
    pub async fn list_rooms(&self) -> Vec<Room> {
        self.rooms.read().await.values().cloned().collect()
    }

    /// Ask the hub to add a connection to a room. Fire-and-forget: there is
    /// no acknowledgement channel, and failures are logged by the loop.
    pub async fn join_room(&self, conn_id: Uuid, room_id: Uuid) {
        self.hub.submit_room_joined(conn_id, room_id).await;
    }

    /// Register a freshly upgraded socket with the hub and return its
    /// connection id.
    pub async fn connect(&self, socket: WebSocket) -> Uuid {
        self.hub.submit_connection(socket).await
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.hub.connection_count()
    }

    #[must_use]
    pub fn tuning(&self) -> Tuning {
        self.hub.tuning()
    }

    /// Stop the hub loop and tear down every connection.
    pub fn shutdown(&self) {
        self.hub.shutdown();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn create_room_is_idempotent_by_name() {
        let service = RealtimeService::new(Tuning::default());
        service.start_event_loop();

        let first = service.create_room("lobby").await;
        let second = service.create_room("lobby").await;
        assert_eq!(first.id, second.id);

        let rooms = service.list_rooms().await;
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].name, "lobby");
    }

    #[tokio::test]
    async fn get_room_by_name_misses_unknown_names() {
        let service = RealtimeService::new(Tuning::default());
        service.start_event_loop();

        assert!(service.get_room_by_name("nope").await.is_none());
        let room = service.create_room("general").await;
        assert_eq!(
            service.get_room_by_name("general").await.map(|r| r.id),
            Some(room.id)
        );
    }

    #[tokio::test]
    async fn join_of_unknown_room_is_not_fatal() {
        let service = RealtimeService::new(Tuning::default());
        service.start_event_loop();

        // The loop warns and carries on; the service stays usable.
        service.join_room(Uuid::new_v4(), Uuid::new_v4()).await;
        let room = service.create_room("after").await;
        assert_eq!(service.get_room_by_name("after").await.map(|r| r.id), Some(room.id));
    }

    #[tokio::test]
    async fn connection_count_starts_at_zero() {
        let service = RealtimeService::new(Tuning::default());
        service.start_event_loop();
        assert_eq!(service.connection_count(), 0);
    }

    #[tokio::test]
    async fn start_event_loop_twice_is_a_noop() {
        let service = RealtimeService::new(Tuning::default());
        service.start_event_loop();
        service.start_event_loop();
        let room = service.create_room("solo").await;
        assert_eq!(service.list_rooms().await.len(), 1);
        assert_eq!(room.name, "solo");
    }
}
