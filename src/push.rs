use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Commands pushed by the device over the page-level WebSocket.
///
/// The socket itself belongs to another component; this crate only consumes
/// the decoded messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PushMessage {
    TriggerUpload,
    CreateFolder,
    Reboot,
    TriggerFileList,
}

const CHANNEL_CAPACITY: usize = 16;

/// Typed fan-out for push messages.
///
/// The socket owner publishes every inbound frame; each interested component
/// holds its own subscription. Subscribers chain side by side instead of
/// wrapping one another's callbacks.
#[derive(Debug, Clone)]
pub struct PushBus {
    tx: broadcast::Sender<PushMessage>,
}

impl PushBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushMessage> {
        self.tx.subscribe()
    }

    pub fn publish(&self, message: PushMessage) {
        // No subscribers is fine; the message is simply dropped.
        let _ = self.tx.send(message);
    }

    /// Decodes a raw socket frame and publishes it. Frames of unrecognized
    /// type are ignored; they belong to other components on the same socket.
    pub fn publish_raw(&self, frame: &str) {
        match serde_json::from_str::<PushMessage>(frame) {
            Ok(message) => {
                tracing::debug!("push message: {message:?}");
                self.publish(message);
            }
            Err(e) => {
                tracing::debug!("ignoring unrecognized push frame: {e}");
            }
        }
    }
}

impl Default for PushBus {
    fn default() -> Self {
        Self::new()
    }
}
