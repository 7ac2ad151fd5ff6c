use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch on the local wall clock.
pub fn current_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_millis() as u64)
        .unwrap_or(0)
}
