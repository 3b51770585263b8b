use std::collections::HashMap;
use std::fmt;

use tokio::sync::{RwLock, mpsc};
use tracing::info;
use uuid::Uuid;

use table_types::{Identity, ServerMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sending half of one live channel, cloned out of the registry so delivery
/// happens without holding the registry lock. The socket itself stays owned
/// by its transport task.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    id: ConnectionId,
    sender: mpsc::Sender<ServerMessage>,
}

impl ChannelHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Best-effort non-blocking enqueue. A full buffer counts as a failed
    /// delivery rather than a reason to wait on a slow consumer.
    pub fn deliver(&self, message: ServerMessage) -> Result<(), String> {
        self.sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => "channel buffer full".to_string(),
            mpsc::error::TrySendError::Closed(_) => "channel closed".to_string(),
        })
    }
}

/// Maps each identity to its currently-open channel. At most one channel per
/// identity: a re-connect replaces the old binding.
pub struct ConnectionRegistry {
    channels: RwLock<HashMap<Identity, ChannelHandle>>,
    channel_capacity: usize,
}

impl ConnectionRegistry {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            channel_capacity,
        }
    }

    /// Opens a fresh bounded channel for `identity` and returns its id plus
    /// the receiving half for the writer task.
    ///
    /// Any prior binding is replaced and its sender dropped; the superseded
    /// writer task sees its channel close and shuts that socket down on its
    /// own. The registry never writes to the old socket.
    pub async fn bind(&self, identity: Identity) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let (sender, receiver) = mpsc::channel(self.channel_capacity);
        let handle = ChannelHandle {
            id: ConnectionId::new(),
            sender,
        };
        let id = handle.id;

        let replaced = self.channels.write().await.insert(identity, handle);
        if let Some(old) = replaced {
            info!(
                "Channel {} for identity {} replaced by {}",
                old.id, identity, id
            );
        }

        (id, receiver)
    }

    pub async fn lookup(&self, identity: Identity) -> Option<ChannelHandle> {
        self.channels.read().await.get(&identity).cloned()
    }

    /// Removes the binding if present; idempotent.
    pub async fn unbind(&self, identity: Identity) {
        self.channels.write().await.remove(&identity);
    }

    /// Removes the binding only while `connection_id` is still the
    /// registered one. A socket that was already replaced must not evict its
    /// replacement when it finally closes.
    pub async fn unbind_if_current(&self, identity: Identity, connection_id: ConnectionId) {
        let mut channels = self.channels.write().await;
        if channels
            .get(&identity)
            .is_some_and(|handle| handle.id == connection_id)
        {
            channels.remove(&identity);
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.channels.read().await.len()
    }
}
