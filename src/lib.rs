//! Watch-party playback synchronization engine.
//!
//! A host session is the single source of truth for "what time is the video
//! at, and is it playing". Every authoritative change fans out over two
//! independent transports: a direct peer data channel (immediate) and a
//! server-held relay record (debounced). Client sessions apply whichever
//! copy arrives first and suppress the probable duplicate.
//!
//! The transports and the player are traits; the crate ships no concrete
//! broker, store, or decoder.

pub mod chat;
pub mod client;
pub mod constants;
pub mod error;
pub mod host;
pub mod playback;
pub mod protocol;
pub mod relay;
pub mod rooms;
pub mod session;
pub mod transport;
pub mod util;

pub use chat::ChatLog;
pub use client::{ClientConfig, ClientSession};
pub use error::{PartyError, SignalingError, SignalingErrorKind};
pub use host::{HostConfig, HostSession};
pub use playback::{PlaybackEvent, PlaybackSurface};
pub use protocol::{
    ChatMessage, ContentRef, ContentType, DirectMessage, MediaRef, SyncAction, SyncState,
};
pub use relay::RelayStore;
pub use rooms::{RoomDirectory, RoomPresence};
pub use session::{PartyPhase, PartyRole, SessionState, TransportState};
pub use transport::{Endpoint, EndpointEvent, LinkEvent, PeerLink, PeerSender, Signaling};
