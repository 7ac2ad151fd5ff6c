//! Session chat log over the relay store.
//!
//! Messages can reach the store out of order relative to their send times, so
//! the rendered order is by timestamp, resolved at snapshot time.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::PartyError;
use crate::protocol::ChatMessage;
use crate::relay::RelayStore;

#[derive(Clone)]
pub struct ChatLog {
    session_id: String,
    display_name: String,
    relay: Arc<dyn RelayStore>,
    messages: Arc<Mutex<Vec<ChatMessage>>>,
}

impl ChatLog {
    pub fn new(
        session_id: impl Into<String>,
        display_name: impl Into<String>,
        relay: Arc<dyn RelayStore>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            display_name: display_name.into(),
            relay,
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Start mirroring the store's chat document into the local list.
    pub fn spawn_subscription(&self) -> JoinHandle<()> {
        let mut rx = self.relay.subscribe_chat(&self.session_id);
        let messages = Arc::clone(&self.messages);
        tokio::spawn(async move {
            while let Some(list) = rx.recv().await {
                *messages.lock() = list;
            }
        })
    }

    /// Send a user message authored by this member.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), PartyError> {
        let message = ChatMessage::user(self.display_name.clone(), text);
        self.relay.append_chat(&self.session_id, message).await
    }

    /// Append an informational system notice. Failures are logged, never
    /// propagated; notices are best-effort.
    pub async fn notice(&self, text: impl Into<String>) {
        let message = ChatMessage::system(text);
        if let Err(e) = self.relay.append_chat(&self.session_id, message).await {
            tracing::warn!("failed to append system notice: {e}");
        }
    }

    /// Current messages, ordered by timestamp ascending.
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut list = self.messages.lock().clone();
        list.sort_by_key(|msg| msg.timestamp);
        list
    }
}
