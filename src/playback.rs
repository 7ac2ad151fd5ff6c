//! Abstract playback surface.
//!
//! The engine only commands the embedded player via seek/play/pause and, on
//! the host side, samples its position to answer sync requests. Decoding and
//! rendering stay with the player.

use crate::protocol::SyncAction;

pub trait PlaybackSurface: Send + Sync + 'static {
    fn seek(&self, time: f64);
    fn play(&self);
    fn pause(&self);

    /// Current playback position in seconds.
    fn position(&self) -> f64;

    fn is_playing(&self) -> bool;
}

/// Discrete event emitted by the host's playback surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackEvent {
    pub action: SyncAction,
    pub time: f64,
}
