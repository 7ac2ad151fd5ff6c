//! Explicit state machines for party membership and transport health.
//!
//! Both are deliberately small. The transport machine encodes the one
//! non-obvious rule of the design: once a session has shown relay-only mode
//! it never promotes back to direct, even if the direct channel opens later.

/// Which side of the party this engine instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyRole {
    Host,
    Client,
}

/// Lifecycle of a party membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyPhase {
    Idle,
    Hosting,
    Joined,
    Disconnected,
}

impl PartyPhase {
    fn allows(self, next: PartyPhase) -> bool {
        use PartyPhase::*;
        matches!(
            (self, next),
            (Idle, Hosting) | (Idle, Joined) | (Hosting, Disconnected) | (Joined, Disconnected)
        )
    }
}

/// Health of the direct channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Direct,
    RelayOnly,
}

impl TransportState {
    fn allows(self, next: TransportState) -> bool {
        use TransportState::*;
        // RelayOnly -> Direct is intentionally absent: no re-promotion once
        // relay mode has been displayed to the user.
        matches!(
            (self, next),
            (Connecting, Direct) | (Connecting, RelayOnly) | (Direct, RelayOnly)
        )
    }
}

/// Tracks both machines for one session.
#[derive(Debug)]
pub struct SessionState {
    phase: PartyPhase,
    transport: TransportState,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: PartyPhase::Idle,
            transport: TransportState::Connecting,
        }
    }

    pub fn phase(&self) -> PartyPhase {
        self.phase
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    /// Apply a phase transition. Illegal transitions are dropped. Returns
    /// whether the phase changed.
    pub fn set_phase(&mut self, next: PartyPhase) -> bool {
        if self.phase == next {
            return false;
        }
        if !self.phase.allows(next) {
            tracing::warn!("ignoring phase transition {:?} -> {:?}", self.phase, next);
            return false;
        }
        tracing::debug!("phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
        true
    }

    /// Apply a transport transition. Illegal transitions are dropped. Returns
    /// whether the transport changed.
    pub fn set_transport(&mut self, next: TransportState) -> bool {
        if self.transport == next {
            return false;
        }
        if !self.transport.allows(next) {
            tracing::debug!(
                "ignoring transport transition {:?} -> {:?}",
                self.transport,
                next
            );
            return false;
        }
        tracing::debug!("transport {:?} -> {:?}", self.transport, next);
        self.transport = next;
        true
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
