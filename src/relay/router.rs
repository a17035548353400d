//! Session router: the message-dispatch state machine.
//!
//! Exclusive owner of the [`ChannelRegistry`] and the [`RoomTable`]. Every
//! state transition a connection can take flows through here:
//!
//! ```text
//! Connected (room_id = None) --join_room--> InRoom --close--> Disconnected
//! ```
//!
//! There is no transition back from `InRoom`; a client leaves a room only
//! via disconnect. Malformed or out-of-order client traffic is handled by
//! best-effort no-ops plus diagnostic logs and never crashes the server or
//! the session.

use crate::protocol::{ClientEvent, ServerEvent};
use crate::relay::channel::RelayChannel;
use crate::relay::registry::{ChannelRegistry, ConnectionId};
use crate::relay::room::{PlayerId, ROOM_CAPACITY, RoomId, RoomTable};

/// The dispatch state machine. One instance per server process, constructed
/// at startup and shared behind a single lock.
#[derive(Default)]
pub struct SessionRouter {
    registry: ChannelRegistry,
    rooms: RoomTable,
}

impl SessionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly accepted connection and return its identity.
    pub fn connect(&mut self, channel: RelayChannel) -> ConnectionId {
        let conn = self.registry.register(channel);
        tracing::info!("Connection '{}' registered", conn);
        conn
    }

    /// Current room table, for the operational HTTP endpoints.
    pub fn rooms(&self) -> &RoomTable {
        &self.rooms
    }

    /// Number of live registered connections.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    /// Dispatch one decoded event from `conn`.
    ///
    /// Events from connections the registry does not know (never registered
    /// or already torn down) are dropped silently.
    pub fn dispatch(&mut self, conn: ConnectionId, event: ClientEvent) {
        if self.registry.lookup(&conn).is_none() {
            tracing::debug!("Dropping event from unregistered connection '{}'", conn);
            return;
        }

        match event {
            ClientEvent::JoinRoom { room_id, player_id } => {
                self.handle_join(conn, room_id, player_id);
            }
            ClientEvent::Chat {
                display_name,
                message,
            } => self.handle_chat(conn, display_name, message),
            ClientEvent::ActionComplete => self.relay_to_room(
                conn,
                |player_id| ServerEvent::ActionComplete {
                    player_id: player_id.into_string(),
                },
                "action_complete",
            ),
            ClientEvent::GameOver => self.relay_to_room(
                conn,
                |player_id| ServerEvent::GameOver {
                    player_id: player_id.into_string(),
                },
                "game_over",
            ),
            ClientEvent::Unrecognized => {
                tracing::debug!("Ignoring unrecognized event from '{}'", conn);
            }
        }
    }

    fn handle_join(&mut self, conn: ConnectionId, room_id: String, player_id: String) {
        let (room_id, player_id) = match (RoomId::new(room_id), PlayerId::new(player_id)) {
            (Ok(room_id), Ok(player_id)) => (room_id, player_id),
            _ => {
                tracing::warn!(
                    "Dropping join_room with empty roomId/playerId from '{}'",
                    conn
                );
                return;
            }
        };

        let channel = {
            let Some(info) = self.registry.lookup(&conn) else {
                return;
            };
            if let Some(current) = &info.room_id {
                tracing::warn!(
                    "Connection '{}' is already in room '{}', ignoring join_room",
                    conn,
                    current
                );
                return;
            }
            info.channel.clone()
        };

        let room = self.rooms.get_or_create(room_id.clone());
        if room.has_member(&player_id) {
            tracing::info!(
                "Player '{}' already in room '{}', ignoring re-join",
                player_id,
                room_id
            );
            return;
        }
        if room.is_full() {
            tracing::warn!(
                "Room '{}' is full, rejecting join of player '{}'",
                room_id,
                player_id
            );
            return;
        }

        room.add_member(player_id.clone(), conn, channel);
        let occupancy = room.member_count();
        tracing::info!(
            "Player '{}' joined room '{}' ({}/{})",
            player_id,
            room_id,
            occupancy,
            ROOM_CAPACITY
        );

        if let Some(info) = self.registry.lookup_mut(&conn) {
            info.room_id = Some(room_id);
            info.player_id = Some(player_id);
        }
    }

    fn handle_chat(&mut self, conn: ConnectionId, display_name: String, message: String) {
        // playerId comes from the registry entry, never from the payload
        self.relay_to_room(
            conn,
            |player_id| ServerEvent::Chat {
                player_id: player_id.into_string(),
                display_name,
                message,
            },
            "chat",
        );
    }

    /// Tear down `conn` after its channel closed.
    ///
    /// The broadcast happens before the removal: the leaver's channel is
    /// already closed and skipped by the open-check, so no exclusion is
    /// needed, while the remaining member still sees the notification.
    pub fn handle_disconnect(&mut self, conn: ConnectionId) {
        let Some(info) = self.registry.unregister(&conn) else {
            tracing::debug!("Disconnect for unknown connection '{}'", conn);
            return;
        };

        let (Some(room_id), Some(player_id)) = (info.room_id, info.player_id) else {
            tracing::info!("Connection '{}' disconnected before joining a room", conn);
            return;
        };

        let emptied = match self.rooms.get_mut(&room_id) {
            Some(room) => {
                room.broadcast(
                    &ServerEvent::Disconnect {
                        player_id: player_id.as_str().to_string(),
                    },
                    None,
                );
                room.remove_member(&player_id);
                tracing::info!(
                    "Player '{}' left room '{}' ({} remaining)",
                    player_id,
                    room_id,
                    room.member_count()
                );
                room.member_count() == 0
            }
            None => {
                tracing::warn!(
                    "Room '{}' already gone at disconnect of player '{}'",
                    room_id,
                    player_id
                );
                false
            }
        };

        if emptied {
            self.rooms.delete(&room_id);
            tracing::info!("Room '{}' emptied and removed", room_id);
        }
    }

    fn relay_to_room(
        &mut self,
        conn: ConnectionId,
        make_event: impl FnOnce(PlayerId) -> ServerEvent,
        kind: &str,
    ) {
        let Some((room_id, player_id)) = self.room_context(&conn) else {
            tracing::debug!("Dropping {} from '{}' outside any room", kind, conn);
            return;
        };
        let Some(room) = self.rooms.get(&room_id) else {
            tracing::warn!(
                "Room '{}' referenced by '{}' no longer exists, dropping {}",
                room_id,
                conn,
                kind
            );
            return;
        };
        // all members receive the relayed event, including the sender
        room.broadcast(&make_event(player_id), None);
    }

    fn room_context(&self, conn: &ConnectionId) -> Option<(RoomId, PlayerId)> {
        let info = self.registry.lookup(conn)?;
        match (&info.room_id, &info.player_id) {
            (Some(room_id), Some(player_id)) => Some((room_id.clone(), player_id.clone())),
            _ => None,
        }
    }

    #[cfg(test)]
    fn client_info(&self, conn: &ConnectionId) -> Option<&crate::relay::registry::ClientInfo> {
        self.registry.lookup(conn)
    }
}
