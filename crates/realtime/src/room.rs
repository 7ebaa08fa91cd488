use std::collections::HashSet;

use {
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

/// Public room descriptor returned by the service façade and the REST
/// surface. Names are unique within a service instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
}

/// Hub-side membership record. Only the hub event loop touches this.
pub(crate) struct RoomState {
    pub id: Uuid,
    pub members: HashSet<Uuid>,
}

impl RoomState {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            members: HashSet::new(),
        }
    }
}
