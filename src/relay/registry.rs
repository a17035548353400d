//! Channel registry: live connections and their session assignment.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::common::time::now_millis;
use crate::relay::channel::RelayChannel;
use crate::relay::room::{PlayerId, RoomId};

/// Server-generated identity of one live connection.
///
/// Generated at registration time and immutable for the connection's
/// lifetime. UUID v4, so it never collides with a live identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-connection bookkeeping.
///
/// `room_id` and `player_id` stay `None` until a successful join; only the
/// join handler sets them and only the disconnect handler consumes them.
pub struct ClientInfo {
    /// Outbound channel to this client
    pub channel: RelayChannel,
    /// Room the client has joined, if any
    pub room_id: Option<RoomId>,
    /// Identifier the client chose for itself within the room, if any
    pub player_id: Option<PlayerId>,
    /// Unix timestamp when connected (UTC, milliseconds)
    pub connected_at: i64,
}

/// Process-wide mapping from connection identity to [`ClientInfo`].
///
/// Entries are added on connect and removed on disconnect; the registry
/// itself lives for the server process's lifetime.
#[derive(Default)]
pub struct ChannelRegistry {
    clients: HashMap<ConnectionId, ClientInfo>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and return its generated identity.
    pub fn register(&mut self, channel: RelayChannel) -> ConnectionId {
        let id = ConnectionId::generate();
        self.clients.insert(
            id,
            ClientInfo {
                channel,
                room_id: None,
                player_id: None,
                connected_at: now_millis(),
            },
        );
        id
    }

    pub fn lookup(&self, id: &ConnectionId) -> Option<&ClientInfo> {
        self.clients.get(id)
    }

    pub fn lookup_mut(&mut self, id: &ConnectionId) -> Option<&mut ClientInfo> {
        self.clients.get_mut(id)
    }

    /// Remove and return the entry. Idempotent: a second call for the same
    /// identity returns `None`.
    pub fn unregister(&mut self, id: &ConnectionId) -> Option<ClientInfo> {
        self.clients.remove(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_channel() -> RelayChannel {
        let (tx, _rx) = mpsc::unbounded_channel();
        RelayChannel::new(tx)
    }

    #[tokio::test]
    async fn test_register_creates_blank_client_info() {
        // given:
        let mut registry = ChannelRegistry::new();

        // when:
        let id = registry.register(test_channel());

        // then:
        let info = registry.lookup(&id).unwrap();
        assert!(info.room_id.is_none());
        assert!(info.player_id.is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_register_generates_distinct_identities() {
        // given:
        let mut registry = ChannelRegistry::new();

        // when:
        let first = registry.register(test_channel());
        let second = registry.register(test_channel());

        // then:
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        // given:
        let mut registry = ChannelRegistry::new();
        let id = registry.register(test_channel());

        // when:
        let first = registry.unregister(&id);
        let second = registry.unregister(&id);

        // then:
        assert!(first.is_some());
        assert!(second.is_none());
        assert!(registry.lookup(&id).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_unknown_connection() {
        // given:
        let registry = ChannelRegistry::new();

        // when:
        let mut other = ChannelRegistry::new();
        let foreign = other.register(test_channel());

        // then:
        assert!(registry.lookup(&foreign).is_none());
    }
}
