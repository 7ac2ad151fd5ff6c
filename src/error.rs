use thiserror::Error;

/// Broad class of a signaling failure, used to decide whether a session can
/// keep running over the relay store alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingErrorKind {
    /// Transient network trouble reaching the connection broker.
    Network,
    /// The broker dropped an established registration.
    Disconnected,
    /// Anything else (bad id, protocol violation).
    Fatal,
}

/// Error surfaced by the signaling/transport provider.
#[derive(Debug, Clone, Error)]
#[error("signaling error ({kind:?}): {message}")]
pub struct SignalingError {
    pub kind: SignalingErrorKind,
    pub message: String,
}

impl SignalingError {
    pub fn new(kind: SignalingErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether the session should degrade to relay-only rather than fail.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            SignalingErrorKind::Network | SignalingErrorKind::Disconnected
        )
    }
}

/// Failures a party session can report to its caller.
#[derive(Debug, Error)]
pub enum PartyError {
    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error("direct connection to host {0} timed out")]
    ConnectTimeout(String),

    #[error("relay store unavailable: {0}")]
    Relay(String),
}
