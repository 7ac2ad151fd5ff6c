//! In-memory collaborators for integration tests: a signaling broker, a
//! relay store, and a recording playback surface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::sleep;
use uuid::Uuid;

use watchparty::{
    ChatMessage, ContentRef, ContentType, Endpoint, EndpointEvent, PartyError, PeerLink,
    PlaybackSurface, RelayStore, RoomPresence, Signaling, SignalingError, SignalingErrorKind,
    SyncState,
};

/// Connection broker that wires peers together with in-process channels.
#[derive(Default)]
pub struct MemorySignaling {
    endpoints: Mutex<HashMap<String, mpsc::UnboundedSender<EndpointEvent>>>,
    allocation_failure: Mutex<Option<SignalingError>>,
    connect_delay: Mutex<Option<Duration>>,
}

impl MemorySignaling {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next endpoint allocation fail with the given class.
    pub fn fail_allocation(&self, kind: SignalingErrorKind) {
        *self.allocation_failure.lock() = Some(SignalingError::new(kind, "broker unreachable"));
    }

    /// Delay every subsequent connection attempt (NAT traversal stand-in).
    pub fn delay_connections(&self, delay: Duration) {
        *self.connect_delay.lock() = Some(delay);
    }

    /// Inject a broker error on an allocated endpoint.
    pub fn endpoint_error(&self, id: &str, error: SignalingError) {
        if let Some(tx) = self.endpoints.lock().get(id) {
            let _ = tx.send(EndpointEvent::Error(error));
        }
    }
}

#[async_trait]
impl Signaling for MemorySignaling {
    async fn allocate_endpoint(
        &self,
        requested_id: Option<&str>,
    ) -> Result<Endpoint, SignalingError> {
        if let Some(error) = self.allocation_failure.lock().take() {
            return Err(error);
        }
        let id = requested_id
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let (tx, rx) = mpsc::unbounded_channel();
        self.endpoints.lock().insert(id.clone(), tx);
        Ok(Endpoint { id, events: rx })
    }

    async fn open_connection(&self, target_id: &str) -> Result<PeerLink, SignalingError> {
        let delay = *self.connect_delay.lock();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        let tx = self
            .endpoints
            .lock()
            .get(target_id)
            .cloned()
            .ok_or_else(|| {
                SignalingError::new(
                    SignalingErrorKind::Network,
                    format!("no endpoint {target_id}"),
                )
            })?;
        let (host_side, client_side) = PeerLink::pair();
        tx.send(EndpointEvent::Connection(host_side)).map_err(|_| {
            SignalingError::new(SignalingErrorKind::Disconnected, "endpoint gone")
        })?;
        Ok(client_side)
    }
}

#[derive(Default)]
struct RelayDocs {
    sync: HashMap<String, SyncState>,
    sync_writes: HashMap<String, Vec<SyncState>>,
    sync_subs: HashMap<String, Vec<mpsc::UnboundedSender<SyncState>>>,
    chat: HashMap<String, Vec<ChatMessage>>,
    chat_subs: HashMap<String, Vec<mpsc::UnboundedSender<Vec<ChatMessage>>>>,
    presence: HashMap<String, RoomPresence>,
}

/// Relay store with last-write-wins sync records and append-only chat.
#[derive(Default)]
pub struct MemoryRelay {
    docs: Mutex<RelayDocs>,
}

impl MemoryRelay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every sync write a session has performed, in order.
    pub fn sync_writes(&self, session_id: &str) -> Vec<SyncState> {
        self.docs
            .lock()
            .sync_writes
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn chat_log(&self, session_id: &str) -> Vec<ChatMessage> {
        self.docs
            .lock()
            .chat
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn presence(&self, session_id: &str) -> Option<RoomPresence> {
        self.docs.lock().presence.get(session_id).cloned()
    }

    fn write_sync(&self, session_id: &str, state: SyncState) {
        let mut docs = self.docs.lock();
        docs.sync.insert(session_id.to_owned(), state.clone());
        docs.sync_writes
            .entry(session_id.to_owned())
            .or_default()
            .push(state.clone());
        if let Some(subs) = docs.sync_subs.get_mut(session_id) {
            subs.retain(|sub| sub.send(state.clone()).is_ok());
        }
    }

    /// Test hook: behave as if some writer overwrote the room record.
    pub fn push_sync(&self, session_id: &str, state: SyncState) {
        self.write_sync(session_id, state);
    }
}

#[async_trait]
impl RelayStore for MemoryRelay {
    async fn write_room_sync(&self, session_id: &str, state: SyncState) -> Result<(), PartyError> {
        self.write_sync(session_id, state);
        Ok(())
    }

    fn subscribe_room_sync(&self, session_id: &str) -> mpsc::UnboundedReceiver<SyncState> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut docs = self.docs.lock();
        if let Some(current) = docs.sync.get(session_id) {
            let _ = tx.send(current.clone());
        }
        docs.sync_subs.entry(session_id.to_owned()).or_default().push(tx);
        rx
    }

    async fn append_chat(&self, session_id: &str, message: ChatMessage) -> Result<(), PartyError> {
        let mut docs = self.docs.lock();
        let log = docs.chat.entry(session_id.to_owned()).or_default();
        log.push(message);
        let snapshot = log.clone();
        if let Some(subs) = docs.chat_subs.get_mut(session_id) {
            subs.retain(|sub| sub.send(snapshot.clone()).is_ok());
        }
        Ok(())
    }

    fn subscribe_chat(&self, session_id: &str) -> mpsc::UnboundedReceiver<Vec<ChatMessage>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut docs = self.docs.lock();
        if let Some(log) = docs.chat.get(session_id) {
            let _ = tx.send(log.clone());
        }
        docs.chat_subs.entry(session_id.to_owned()).or_default().push(tx);
        rx
    }

    async fn register_presence(&self, presence: RoomPresence) -> Result<(), PartyError> {
        self.docs
            .lock()
            .presence
            .insert(presence.session_id.clone(), presence);
        Ok(())
    }

    async fn remove_presence(&self, session_id: &str) -> Result<(), PartyError> {
        self.docs.lock().presence.remove(session_id);
        Ok(())
    }

    async fn list_rooms(&self) -> Result<Vec<RoomPresence>, PartyError> {
        Ok(self.docs.lock().presence.values().cloned().collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Seek(f64),
    Play,
    Pause,
}

/// Playback surface that records every command it receives.
#[derive(Default)]
pub struct RecordingPlayer {
    calls: Mutex<Vec<PlayerCall>>,
    position: Mutex<f64>,
    playing: Mutex<bool>,
}

impl RecordingPlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn set_position(&self, position: f64) {
        *self.position.lock() = position;
    }

    pub fn set_playing(&self, playing: bool) {
        *self.playing.lock() = playing;
    }
}

impl PlaybackSurface for RecordingPlayer {
    fn seek(&self, time: f64) {
        self.calls.lock().push(PlayerCall::Seek(time));
        *self.position.lock() = time;
    }

    fn play(&self) {
        self.calls.lock().push(PlayerCall::Play);
        *self.playing.lock() = true;
    }

    fn pause(&self) {
        self.calls.lock().push(PlayerCall::Pause);
        *self.playing.lock() = false;
    }

    fn position(&self) -> f64 {
        *self.position.lock()
    }

    fn is_playing(&self) -> bool {
        *self.playing.lock()
    }
}

/// What a host is watching in these tests.
pub fn series_content() -> ContentRef {
    ContentRef {
        content_id: "tt4574334".into(),
        content_type: ContentType::Series,
        season: 1,
        episode: 1,
    }
}

/// Let spawned tasks drain their channels without advancing the clock.
pub async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
    }
}
