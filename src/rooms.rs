//! Room directory: presence records and room listing, thin over the relay.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PartyError;
use crate::protocol::ContentRef;
use crate::relay::RelayStore;

/// Presence record a host registers so lobbies can list the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomPresence {
    pub session_id: String,
    pub room_name: String,
    pub host_name: String,
    pub is_private: bool,
    pub content: ContentRef,
}

/// Read-side of the directory, for lobby UIs.
#[derive(Clone)]
pub struct RoomDirectory {
    relay: Arc<dyn RelayStore>,
}

impl RoomDirectory {
    pub fn new(relay: Arc<dyn RelayStore>) -> Self {
        Self { relay }
    }

    /// Publicly listed rooms.
    pub async fn list_public(&self) -> Result<Vec<RoomPresence>, PartyError> {
        let rooms = self.relay.list_rooms().await?;
        Ok(rooms.into_iter().filter(|room| !room.is_private).collect())
    }

    /// Every registered room, private ones included.
    pub async fn list_all(&self) -> Result<Vec<RoomPresence>, PartyError> {
        self.relay.list_rooms().await
    }
}
