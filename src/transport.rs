//! Abstract signaling/transport provider.
//!
//! The engine never talks to a concrete broker; it consumes this capability.
//! Events arrive over channels rather than registered callbacks so handlers
//! run inside the engine's own tasks.

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::SignalingError;
use crate::protocol::DirectMessage;

/// Event observed on one peer link.
#[derive(Debug)]
pub enum LinkEvent {
    Data(DirectMessage),
    Closed,
}

/// Sending half of a peer link. Cheap to clone; the host keeps one per
/// connected client in its fan-out set.
#[derive(Debug, Clone)]
pub struct PeerSender {
    id: Uuid,
    tx: mpsc::UnboundedSender<DirectMessage>,
}

impl PeerSender {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a message. Fails once the remote side has gone away.
    pub fn send(&self, msg: DirectMessage) -> Result<(), SignalingError> {
        self.tx.send(msg).map_err(|_| {
            SignalingError::new(
                crate::error::SignalingErrorKind::Disconnected,
                format!("peer link {} closed", self.id),
            )
        })
    }
}

/// One open, bidirectional peer data channel.
#[derive(Debug)]
pub struct PeerLink {
    pub sender: PeerSender,
    pub events: mpsc::UnboundedReceiver<LinkEvent>,
}

impl PeerLink {
    pub fn new(
        id: Uuid,
        tx: mpsc::UnboundedSender<DirectMessage>,
        events: mpsc::UnboundedReceiver<LinkEvent>,
    ) -> Self {
        Self {
            sender: PeerSender { id, tx },
            events,
        }
    }

    /// Build a cross-wired in-process pair. Each side's sends surface as
    /// `Data` events on the other side; dropping a side's sender delivers
    /// `Closed` to its peer.
    pub fn pair() -> (PeerLink, PeerLink) {
        let id = Uuid::new_v4();
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        let (a_ev_tx, a_ev_rx) = mpsc::unbounded_channel();
        let (b_ev_tx, b_ev_rx) = mpsc::unbounded_channel();

        tokio::spawn(pump(a_rx, b_ev_tx));
        tokio::spawn(pump(b_rx, a_ev_tx));

        (
            PeerLink::new(id, a_tx, a_ev_rx),
            PeerLink::new(id, b_tx, b_ev_rx),
        )
    }
}

async fn pump(
    mut rx: mpsc::UnboundedReceiver<DirectMessage>,
    ev_tx: mpsc::UnboundedSender<LinkEvent>,
) {
    while let Some(msg) = rx.recv().await {
        if ev_tx.send(LinkEvent::Data(msg)).is_err() {
            return;
        }
    }
    let _ = ev_tx.send(LinkEvent::Closed);
}

/// Event observed on a host's allocated endpoint.
pub enum EndpointEvent {
    /// A client opened a connection to us.
    Connection(PeerLink),
    /// The broker reported trouble with our registration.
    Error(SignalingError),
}

/// A public endpoint other peers can connect to.
pub struct Endpoint {
    /// The identifier the broker actually allocated; doubles as the session's
    /// public id.
    pub id: String,
    pub events: mpsc::UnboundedReceiver<EndpointEvent>,
}

/// Connection broker capability consumed by the engine.
#[async_trait]
pub trait Signaling: Send + Sync + 'static {
    /// Allocate a public endpoint, preferring `requested_id` when given.
    async fn allocate_endpoint(
        &self,
        requested_id: Option<&str>,
    ) -> Result<Endpoint, SignalingError>;

    /// Open a direct channel to a host endpoint. Resolves once the channel
    /// is open.
    async fn open_connection(&self, target_id: &str) -> Result<PeerLink, SignalingError>;
}
