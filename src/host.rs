//! Host role: the single source of truth for playback position and episode
//! selection, fanned out over both transports.
//!
//! Direct links get every event immediately. The relay store gets a debounced
//! copy (the last event within the window) so rapid scrubbing never floods
//! the shared record; relay writes exist for clients with no direct channel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

use crate::chat::ChatLog;
use crate::constants::RELAY_DEBOUNCE;
use crate::error::PartyError;
use crate::playback::{PlaybackEvent, PlaybackSurface};
use crate::protocol::{ChatMessage, ContentRef, DirectMessage, SyncAction, SyncState};
use crate::relay::RelayStore;
use crate::rooms::RoomPresence;
use crate::session::{PartyPhase, SessionState, TransportState};
use crate::transport::{EndpointEvent, LinkEvent, PeerLink, PeerSender, Signaling};

/// Parameters for opening a session as host.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Preferred public identifier; the broker may allocate a different one.
    /// Generated when absent.
    pub session_id: Option<String>,
    pub room_name: String,
    pub host_name: String,
    pub is_private: bool,
    pub content: ContentRef,
}

enum DebounceCmd {
    /// Queue a state for the debounced relay write, restarting the window.
    Queue(SyncState),
    /// Write this state now, discarding anything pending.
    WriteNow(SyncState),
}

pub struct HostSession {
    inner: Arc<HostInner>,
}

struct HostInner {
    session_id: String,
    relay: Arc<dyn RelayStore>,
    player: Arc<dyn PlaybackSurface>,
    chat: ChatLog,
    content: Mutex<ContentRef>,
    state: Mutex<SessionState>,
    links: Mutex<HashMap<Uuid, PeerSender>>,
    debounce_tx: mpsc::UnboundedSender<DebounceCmd>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl HostSession {
    /// Open a session. A failed endpoint allocation degrades the session to
    /// relay-only; an unreachable relay store is the one fatal case.
    pub async fn start(
        signaling: Arc<dyn Signaling>,
        relay: Arc<dyn RelayStore>,
        player: Arc<dyn PlaybackSurface>,
        config: HostConfig,
    ) -> Result<HostSession, PartyError> {
        let endpoint = match signaling.allocate_endpoint(config.session_id.as_deref()).await {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                tracing::warn!("endpoint allocation failed, continuing relay-only: {e}");
                None
            }
        };

        let session_id = endpoint
            .as_ref()
            .map(|ep| ep.id.clone())
            .or_else(|| config.session_id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut state = SessionState::new();
        state.set_phase(PartyPhase::Hosting);
        state.set_transport(if endpoint.is_some() {
            TransportState::Direct
        } else {
            TransportState::RelayOnly
        });

        let presence = RoomPresence {
            session_id: session_id.clone(),
            room_name: config.room_name.clone(),
            host_name: config.host_name.clone(),
            is_private: config.is_private,
            content: config.content.clone(),
        };

        let (debounce_tx, debounce_rx) = mpsc::unbounded_channel();
        let chat = ChatLog::new(&session_id, &config.host_name, Arc::clone(&relay));
        let inner = Arc::new(HostInner {
            session_id: session_id.clone(),
            relay: Arc::clone(&relay),
            player,
            chat,
            content: Mutex::new(config.content),
            state: Mutex::new(state),
            links: Mutex::new(HashMap::new()),
            debounce_tx,
            tasks: Mutex::new(Vec::new()),
        });

        relay.register_presence(presence).await?;
        // Initial record: media context and wall clock only, nothing has
        // played yet.
        let media = inner.content.lock().media();
        relay.write_room_sync(&session_id, SyncState::initial(media)).await?;

        inner.spawn(inner.chat.spawn_subscription());
        inner.spawn(tokio::spawn(run_debounce(relay, session_id, debounce_rx)));

        match endpoint {
            Some(endpoint) => {
                let endpoint_inner = Arc::clone(&inner);
                inner.spawn(tokio::spawn(async move {
                    endpoint_inner.run_endpoint(endpoint.events).await;
                }));
                tracing::info!("hosting session {}", inner.session_id);
            }
            None => {
                inner
                    .chat
                    .notice("Direct connections unavailable; syncing over the relay")
                    .await;
            }
        }

        Ok(HostSession { inner })
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Host counts as 1; only live direct links add to this. Relay-only
    /// viewers are not counted.
    pub fn participant_count(&self) -> usize {
        self.inner.participant_count()
    }

    pub fn transport_state(&self) -> TransportState {
        self.inner.state.lock().transport()
    }

    pub fn content(&self) -> ContentRef {
        self.inner.content.lock().clone()
    }

    /// Feed one playback event observed on the host's player. Fans out to
    /// every open link immediately and queues the debounced relay write.
    pub fn handle_playback_event(&self, event: PlaybackEvent) {
        let media = self.inner.content.lock().media();
        self.inner.broadcast_direct(DirectMessage::Sync {
            action: event.action,
            time: event.time,
        });
        let state = SyncState::for_action(event.action, event.time, media);
        let _ = self.inner.debounce_tx.send(DebounceCmd::Queue(state));
    }

    /// Switch episodes. Broadcast immediately on both channels: the change
    /// redefines the meaning of every subsequent time value. The relay copy
    /// forces playback from the beginning for relay-only viewers and goes
    /// through the debounce task, so a pending write whose timer already
    /// elapsed can never land after it.
    pub fn change_episode(&self, season: u32, episode: u32) {
        let media = {
            let mut content = self.inner.content.lock();
            content.season = season;
            content.episode = episode;
            content.media()
        };
        self.inner.broadcast_direct(DirectMessage::EpisodeChange { media });
        let state = SyncState::for_action(SyncAction::Play, 0.0, media);
        let _ = self.inner.debounce_tx.send(DebounceCmd::WriteNow(state));
    }

    pub async fn send_chat(&self, text: impl Into<String>) -> Result<(), PartyError> {
        self.inner.chat.send(text).await
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.chat.messages()
    }

    /// End the session for everyone: close links and remove relay records.
    pub async fn shutdown(&self) {
        self.inner.state.lock().set_phase(PartyPhase::Disconnected);
        self.inner.links.lock().clear();
        if let Err(e) = self.inner.relay.remove_presence(&self.inner.session_id).await {
            tracing::warn!("failed to remove presence record: {e}");
        }
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for HostSession {
    fn drop(&mut self) {
        self.inner.links.lock().clear();
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl HostInner {
    fn spawn(&self, task: JoinHandle<()>) {
        self.tasks.lock().push(task);
    }

    fn participant_count(&self) -> usize {
        self.links.lock().len() + 1
    }

    async fn run_endpoint(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<EndpointEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                EndpointEvent::Connection(link) => Arc::clone(&self).accept(link).await,
                EndpointEvent::Error(e) if e.is_recoverable() => {
                    tracing::warn!("endpoint degraded: {e}");
                    if self.state.lock().set_transport(TransportState::RelayOnly) {
                        self.chat
                            .notice("Direct connections lost; syncing over the relay")
                            .await;
                    }
                }
                EndpointEvent::Error(e) => tracing::error!("endpoint error: {e}"),
            }
        }
    }

    async fn accept(self: Arc<Self>, link: PeerLink) {
        let PeerLink { sender, events } = link;
        let id = sender.id();

        // Align the newcomer's episode context before any playback event
        // reaches it; a full snapshot follows once it requests sync.
        let media = self.content.lock().media();
        let _ = sender.send(DirectMessage::EpisodeChange { media });

        self.links.lock().insert(id, sender);
        tracing::info!(
            "client {id} connected ({} watching)",
            self.participant_count()
        );
        self.chat.notice("A viewer joined the party").await;

        let link_inner = Arc::clone(&self);
        self.spawn(tokio::spawn(async move {
            link_inner.run_link(id, events).await;
        }));
    }

    async fn run_link(self: Arc<Self>, id: Uuid, mut events: mpsc::UnboundedReceiver<LinkEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                LinkEvent::Data(DirectMessage::RequestSync) => {
                    let snapshot = DirectMessage::SyncAbsolute {
                        playing: self.player.is_playing(),
                        time: self.player.position(),
                    };
                    let sender = self.links.lock().get(&id).cloned();
                    if let Some(sender) = sender {
                        let _ = sender.send(snapshot);
                    }
                }
                LinkEvent::Data(other) => {
                    tracing::debug!("ignoring client message from {id}: {other:?}")
                }
                LinkEvent::Closed => break,
            }
        }

        if self.links.lock().remove(&id).is_some() {
            tracing::info!(
                "client {id} disconnected ({} watching)",
                self.participant_count()
            );
            self.chat.notice("A viewer left the party").await;
        }
    }

    /// Send immediately to every open link, pruning any that have closed.
    fn broadcast_direct(&self, msg: DirectMessage) {
        let mut links = self.links.lock();
        links.retain(|id, sender| match sender.send(msg.clone()) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!("dropping closed link {id}");
                false
            }
        });
    }
}

/// Coalesce rapid events into one relay write per quiet window. Each new
/// event restarts the window; only the last event's state is written.
/// Every post-start sync write flows through this task, so an immediate
/// write and a pending debounced one cannot land out of order.
async fn run_debounce(
    relay: Arc<dyn RelayStore>,
    session_id: String,
    mut rx: mpsc::UnboundedReceiver<DebounceCmd>,
) {
    while let Some(cmd) = rx.recv().await {
        let mut pending = match cmd {
            DebounceCmd::Queue(state) => state,
            DebounceCmd::WriteNow(state) => {
                write_sync(&*relay, &session_id, state).await;
                continue;
            }
        };
        loop {
            tokio::select! {
                _ = sleep(RELAY_DEBOUNCE) => {
                    write_sync(&*relay, &session_id, pending).await;
                    break;
                }
                next = rx.recv() => match next {
                    Some(DebounceCmd::Queue(state)) => pending = state,
                    Some(DebounceCmd::WriteNow(state)) => {
                        write_sync(&*relay, &session_id, state).await;
                        break;
                    }
                    None => return,
                },
            }
        }
    }
}

async fn write_sync(relay: &dyn RelayStore, session_id: &str, state: SyncState) {
    if let Err(e) = relay.write_room_sync(session_id, state).await {
        tracing::warn!("relay sync write failed: {e}");
    }
}
