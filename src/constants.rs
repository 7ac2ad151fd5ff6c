use std::time::Duration;

/// How long the host waits for playback events to stop before writing the
/// coalesced state to the relay store.
pub const RELAY_DEBOUNCE: Duration = Duration::from_millis(1000);

/// After applying a direct-channel sync, relay syncs arriving within this
/// window are treated as duplicates of the same logical event and dropped.
pub const SUPPRESSION_WINDOW: Duration = Duration::from_millis(500);

/// Gap between seek and play/pause when applying an absolute snapshot, so the
/// seek settles before playback state changes.
pub const SETTLE_DELAY: Duration = Duration::from_millis(400);

/// How long a joining client waits for the direct channel before reporting
/// relay-only mode. The connection attempt itself is not aborted.
pub const DIRECT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
