use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};
use tungstenite::Message;

use crate::dispatch::ConnectionId;

/// Every open WebSocket session, keyed by connection id.
///
/// Cloning is cheap and clones share the same sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<ConnectionId, UnboundedSender<Message>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Queues `message` for one session, `false` when it is gone.
    pub fn send_to(&self, id: ConnectionId, message: Message) -> bool {
        self.sessions.get(&id).is_some_and(|sender| sender.send(message).is_ok())
    }

    /// Queues `message` for every session, returning how many accepted it.
    pub fn broadcast(&self, message: &Message) -> usize {
        let delivered = self.sessions.iter().filter(|entry| entry.value().send(message.clone()).is_ok()).count();
        trace!(delivered, "broadcast message");
        delivered
    }

    /// Registers a session until the returned guard is dropped.
    pub(crate) fn register(&self, id: ConnectionId, sender: UnboundedSender<Message>) -> Registration {
        self.sessions.insert(id, sender);
        debug!(%id, sessions = self.sessions.len(), "session registered");
        Registration { id, registry: self.clone() }
    }
}

/// Removes its session from the registry on drop.
#[derive(Debug)]
pub(crate) struct Registration {
    id: ConnectionId,
    registry: SessionRegistry,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.sessions.remove(&self.id);
        debug!(id = %self.id, sessions = self.registry.sessions.len(), "session removed");
    }
}

/// A WebSocket connection as seen by a [`WebSocketHandler`](crate::handler::WebSocketHandler).
#[derive(Debug, Clone)]
pub struct Session {
    id: ConnectionId,
    peer: SocketAddr,
    path: String,
    outbound: UnboundedSender<Message>,
    registry: SessionRegistry,
}

impl Session {
    pub(crate) fn new(
        id: ConnectionId,
        peer: SocketAddr,
        path: String,
        outbound: UnboundedSender<Message>,
        registry: SessionRegistry,
    ) -> Self {
        Self { id, peer, path, outbound, registry }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Path of the handshake request.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Queues a message for this session, `false` once it has closed.
    pub fn send(&self, message: Message) -> bool {
        self.outbound.send(message).is_ok()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }
}
