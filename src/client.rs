//! Client role: reproduce the host's playback state with minimal lag while
//! tolerating either transport being absent, delayed, or duplicated.
//!
//! Both channels feed the same seek/play/pause primitives. A wall-clock
//! marker stamped on every direct-channel apply suppresses the relay copy of
//! the same logical event; an episode change zeroes the marker because its
//! suppression window is no longer meaningful.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

use crate::chat::ChatLog;
use crate::constants::{DIRECT_CONNECT_TIMEOUT, SETTLE_DELAY, SUPPRESSION_WINDOW};
use crate::error::PartyError;
use crate::playback::PlaybackSurface;
use crate::protocol::{ChatMessage, DirectMessage, MediaRef, SyncAction, SyncState};
use crate::relay::RelayStore;
use crate::session::{PartyPhase, SessionState, TransportState};
use crate::transport::{LinkEvent, PeerLink, PeerSender, Signaling};
use crate::util::current_unix_millis;

/// Parameters for joining an existing session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The host's public identifier.
    pub session_id: String,
    pub display_name: String,
    /// Episode context the viewer opened with; reconciled against the host's
    /// on the first sync.
    pub media: MediaRef,
}

pub struct ClientSession {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    session_id: String,
    player: Arc<dyn PlaybackSurface>,
    chat: ChatLog,
    media: Mutex<MediaRef>,
    state: Mutex<SessionState>,
    direct: Mutex<Option<PeerSender>>,
    /// Last direct-channel apply; used only to suppress the relay duplicate.
    last_direct_apply: Mutex<Option<Instant>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ClientSession {
    /// Join a session. Relay subscriptions start immediately; the direct
    /// connection attempt races its timeout in the background.
    pub async fn start(
        signaling: Arc<dyn Signaling>,
        relay: Arc<dyn RelayStore>,
        player: Arc<dyn PlaybackSurface>,
        config: ClientConfig,
    ) -> Result<ClientSession, PartyError> {
        let mut state = SessionState::new();
        state.set_phase(PartyPhase::Joined);

        let chat = ChatLog::new(&config.session_id, &config.display_name, Arc::clone(&relay));
        let inner = Arc::new(ClientInner {
            session_id: config.session_id.clone(),
            player,
            chat,
            media: Mutex::new(config.media),
            state: Mutex::new(state),
            direct: Mutex::new(None),
            last_direct_apply: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        });

        inner.spawn(inner.chat.spawn_subscription());

        let mut sync_rx = relay.subscribe_room_sync(&config.session_id);
        let relay_inner = Arc::clone(&inner);
        inner.spawn(tokio::spawn(async move {
            while let Some(record) = sync_rx.recv().await {
                relay_inner.apply_relay_sync(record);
            }
        }));

        let connect_inner = Arc::clone(&inner);
        inner.spawn(tokio::spawn(async move {
            connect_inner.run_direct(signaling).await;
        }));

        Ok(ClientSession { inner })
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn transport_state(&self) -> TransportState {
        self.inner.state.lock().transport()
    }

    /// Episode context as last reconciled with the host.
    pub fn media(&self) -> MediaRef {
        *self.inner.media.lock()
    }

    /// Ask the host for a fresh absolute snapshot. Same message the engine
    /// sends automatically when the direct channel opens.
    pub fn request_resync(&self) {
        let direct = self.inner.direct.lock().clone();
        match direct {
            Some(sender) => {
                let _ = sender.send(DirectMessage::RequestSync);
            }
            None => tracing::debug!("manual resync requested without a direct channel"),
        }
    }

    pub async fn send_chat(&self, text: impl Into<String>) -> Result<(), PartyError> {
        self.inner.chat.send(text).await
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.chat.messages()
    }

    /// Leave the session. Clients do not own it; this just disconnects.
    pub fn shutdown(&self) {
        self.inner.state.lock().set_phase(PartyPhase::Disconnected);
        *self.inner.direct.lock() = None;
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        *self.inner.direct.lock() = None;
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl ClientInner {
    fn spawn(&self, task: JoinHandle<()>) {
        self.tasks.lock().push(task);
    }

    async fn run_direct(self: Arc<Self>, signaling: Arc<dyn Signaling>) {
        let connect = signaling.open_connection(&self.session_id);
        tokio::pin!(connect);
        let timeout = sleep(DIRECT_CONNECT_TIMEOUT);
        tokio::pin!(timeout);
        let mut timed_out = false;

        let result = loop {
            tokio::select! {
                res = &mut connect => break res,
                _ = &mut timeout, if !timed_out => {
                    // Report relay-only but keep the attempt running; a late
                    // open still carries data, it just never re-displays as
                    // direct.
                    timed_out = true;
                    self.state.lock().set_transport(TransportState::RelayOnly);
                    tracing::info!(
                        "direct connection to {} timed out; relay-only",
                        self.session_id
                    );
                }
            }
        };

        let link = match result {
            Ok(link) => link,
            Err(e) => {
                self.state.lock().set_transport(TransportState::RelayOnly);
                tracing::debug!("direct connection failed: {e}");
                return;
            }
        };

        // Refused by the FSM when relay-only has already been displayed.
        self.state.lock().set_transport(TransportState::Direct);

        let PeerLink { sender, mut events } = link;
        let _ = sender.send(DirectMessage::RequestSync);
        *self.direct.lock() = Some(sender);
        tracing::info!("direct channel to {} open", self.session_id);

        while let Some(event) = events.recv().await {
            match event {
                LinkEvent::Data(msg) => self.apply_direct(msg),
                LinkEvent::Closed => break,
            }
        }

        // Silent fallback: the status indicator flips, chat and sync keep
        // flowing over the relay.
        *self.direct.lock() = None;
        self.state.lock().set_transport(TransportState::RelayOnly);
        tracing::info!("direct channel closed; relay-only");
    }

    fn apply_direct(&self, msg: DirectMessage) {
        match msg {
            DirectMessage::Sync { action, time } => {
                self.stamp_direct_apply();
                self.apply_action(action, time);
            }
            DirectMessage::SyncAbsolute { playing, time } => {
                self.stamp_direct_apply();
                // Seek first; play/pause follows once the seek has settled,
                // since issuing both at once is unreliable on many players.
                self.player.seek(time);
                let player = Arc::clone(&self.player);
                tokio::spawn(async move {
                    sleep(SETTLE_DELAY).await;
                    if playing {
                        player.play();
                    } else {
                        player.pause();
                    }
                });
            }
            DirectMessage::EpisodeChange { media } => self.apply_media(media),
            DirectMessage::RequestSync => {
                tracing::debug!("ignoring host-bound message on client")
            }
        }
    }

    /// Ingest one relay record. Media context first, then the action unless
    /// it is the probable duplicate of a direct sync just applied.
    fn apply_relay_sync(&self, record: SyncState) {
        if *self.media.lock() != record.media {
            self.apply_media(record.media);
        }

        let Some(action) = record.action else {
            return;
        };

        if self.recently_applied_direct() {
            tracing::debug!("suppressing relay duplicate of a direct sync");
            return;
        }

        match record.time {
            Some(time) => {
                // A playing position keeps advancing while the record is in
                // flight; a paused or explicitly sought one does not.
                let target = if action == SyncAction::Play {
                    time + self.relay_latency_secs(record.timestamp)
                } else {
                    time
                };
                self.apply_action(action, target);
            }
            // Partial record: apply the subset that is present, never reject.
            None => match action {
                SyncAction::Play => self.player.play(),
                SyncAction::Pause => self.player.pause(),
                SyncAction::Seek => {}
            },
        }
    }

    fn apply_action(&self, action: SyncAction, time: f64) {
        match action {
            SyncAction::Play => {
                self.player.seek(time);
                self.player.play();
            }
            SyncAction::Pause => {
                self.player.seek(time);
                self.player.pause();
            }
            SyncAction::Seek => self.player.seek(time),
        }
    }

    fn apply_media(&self, media: MediaRef) {
        {
            let mut current = self.media.lock();
            if *current != media {
                tracing::debug!("episode context {:?} -> {:?}", *current, media);
                *current = media;
            }
        }
        // The next sync is for a new episode and must never be dropped as a
        // duplicate of a stale one.
        *self.last_direct_apply.lock() = None;
    }

    fn stamp_direct_apply(&self) {
        *self.last_direct_apply.lock() = Some(Instant::now());
    }

    fn recently_applied_direct(&self) -> bool {
        self.last_direct_apply
            .lock()
            .map_or(false, |mark| mark.elapsed() < SUPPRESSION_WINDOW)
    }

    fn relay_latency_secs(&self, sent_at: u64) -> f64 {
        current_unix_millis().saturating_sub(sent_at) as f64 / 1000.0
    }
}
