//! Abstract relay store: the server-held fallback transport and chat log.
//!
//! The room sync record has overwrite (last-write-wins) semantics, not queue
//! semantics; a subscriber that misses an intermediate write never sees it.
//! Chat is append-only, so concurrent writers cannot conflict.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::PartyError;
use crate::protocol::{ChatMessage, SyncState};
use crate::rooms::RoomPresence;

#[async_trait]
pub trait RelayStore: Send + Sync + 'static {
    /// Overwrite the room's sync record. Fire-and-forget from the caller's
    /// perspective; the host is the only writer per session.
    async fn write_room_sync(&self, session_id: &str, state: SyncState) -> Result<(), PartyError>;

    /// Subscribe to sync record changes. The current value, when one exists,
    /// is delivered first.
    fn subscribe_room_sync(&self, session_id: &str) -> mpsc::UnboundedReceiver<SyncState>;

    async fn append_chat(&self, session_id: &str, message: ChatMessage) -> Result<(), PartyError>;

    /// Subscribe to the chat log. Each notification carries the full message
    /// list; the store is a document, not a queue.
    fn subscribe_chat(&self, session_id: &str) -> mpsc::UnboundedReceiver<Vec<ChatMessage>>;

    async fn register_presence(&self, presence: RoomPresence) -> Result<(), PartyError>;

    async fn remove_presence(&self, session_id: &str) -> Result<(), PartyError>;

    async fn list_rooms(&self) -> Result<Vec<RoomPresence>, PartyError>;
}
