use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::current_unix_millis;

/// Playback actions a host can broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Play,
    Pause,
    Seek,
}

/// Episode context within the content being watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub season: u32,
    pub episode: u32,
}

impl MediaRef {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }
}

impl Default for MediaRef {
    fn default() -> Self {
        Self {
            season: 1,
            episode: 1,
        }
    }
}

/// Kind of content a session is watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Series,
}

/// Identifies what a session is watching. Mutable only by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub content_id: String,
    pub content_type: ContentType,
    pub season: u32,
    pub episode: u32,
}

impl ContentRef {
    pub fn media(&self) -> MediaRef {
        MediaRef::new(self.season, self.episode)
    }
}

/// Authoritative playback snapshot the host writes to the relay store.
///
/// `timestamp` is host wall-clock epoch millis at the moment `time` was
/// sampled; consumers must never mix timestamps from different senders.
/// `action` and `time` are absent on the initial publish (nothing has played)
/// and tolerated missing on ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub action: Option<SyncAction>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time: Option<f64>,
    pub timestamp: u64,
    pub media: MediaRef,
}

impl SyncState {
    /// Initial record published when a session opens: media context only.
    pub fn initial(media: MediaRef) -> Self {
        Self {
            action: None,
            time: None,
            timestamp: current_unix_millis(),
            media,
        }
    }

    pub fn for_action(action: SyncAction, time: f64, media: MediaRef) -> Self {
        Self {
            action: Some(action),
            time: Some(time),
            timestamp: current_unix_millis(),
            media,
        }
    }
}

/// Messages exchanged over the direct peer channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DirectMessage {
    /// Live playback action, relayed the moment the host observes it.
    Sync { action: SyncAction, time: f64 },
    /// Point-in-time snapshot answering a sync request.
    SyncAbsolute { playing: bool, time: f64 },
    /// Episode selection changed; redefines the meaning of subsequent times.
    EpisodeChange { media: MediaRef },
    /// Client asks the host for a fresh absolute snapshot.
    RequestSync,
}

/// One chat entry. Ordering is by `timestamp` at render time, not arrival
/// order, because messages can arrive over either channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: String,
    pub text: String,
    pub timestamp: u64,
    #[serde(default)]
    pub is_system: bool,
}

impl ChatMessage {
    pub fn user(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: sender.into(),
            text: text.into(),
            timestamp: current_unix_millis(),
            is_system: false,
        }
    }

    /// Informational notice (join/leave/sync); has no interactive sender.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: String::new(),
            text: text.into(),
            timestamp: current_unix_millis(),
            is_system: true,
        }
    }
}
