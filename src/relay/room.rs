//! Room table and two-player rooms.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::common::time::now_millis;
use crate::protocol::ServerEvent;
use crate::relay::channel::RelayChannel;
use crate::relay::registry::ConnectionId;

/// Number of participants that makes a room full.
pub const ROOM_CAPACITY: usize = 2;

/// Error returned when a wire-supplied identifier is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("identifier must not be empty")]
    Empty,
}

/// Session identifier, supplied by the first joining client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, IdError> {
        if value.is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier a client chose to represent itself within a room, distinct
/// from the server-generated connection identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(value: String) -> Result<Self, IdError> {
        if value.is_empty() {
            return Err(IdError::Empty);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One occupied participant slot.
pub struct RoomMember {
    pub player_id: PlayerId,
    pub identity: ConnectionId,
    pub channel: RelayChannel,
}

/// A two-player session.
///
/// Members are kept in join order. The room itself never enforces the
/// capacity; duplicate-join and fullness checks live in the router so the
/// whole join protocol reads in one place.
pub struct Room {
    pub id: RoomId,
    members: Vec<RoomMember>,
    /// Unix timestamp when created (UTC, milliseconds)
    pub created_at: i64,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            members: Vec::with_capacity(ROOM_CAPACITY),
            created_at: now_millis(),
        }
    }

    pub fn has_member(&self, player_id: &PlayerId) -> bool {
        self.members.iter().any(|m| &m.player_id == player_id)
    }

    /// Insert a member.
    ///
    /// Caller-enforced precondition: `has_member(player_id)` is false. When
    /// the insertion fills the room, every member (no exclusion) receives a
    /// `game_started` event; this is the only room-fullness signal.
    pub fn add_member(&mut self, player_id: PlayerId, identity: ConnectionId, channel: RelayChannel) {
        self.members.push(RoomMember {
            player_id,
            identity,
            channel,
        });

        if self.members.len() == ROOM_CAPACITY {
            tracing::info!("Room '{}' is full, starting game", self.id);
            self.broadcast(&ServerEvent::GameStarted, None);
        }
    }

    /// Remove a member if present; no-op otherwise.
    pub fn remove_member(&mut self, player_id: &PlayerId) {
        self.members.retain(|m| &m.player_id != player_id);
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= ROOM_CAPACITY
    }

    /// Player ids in join order.
    pub fn player_ids(&self) -> Vec<&PlayerId> {
        self.members.iter().map(|m| &m.player_id).collect()
    }

    /// Fan `event` out to every member except `exclude`.
    ///
    /// Members whose channel is closed are silently skipped; removal of dead
    /// members is the router's job, driven by the disconnect signal. Send
    /// failures are tolerated per member.
    pub fn broadcast(&self, event: &ServerEvent, exclude: Option<ConnectionId>) {
        let frame = event.to_frame();
        for member in &self.members {
            if Some(member.identity) == exclude {
                continue;
            }
            if member.channel.is_closed() {
                tracing::debug!(
                    "Skipping closed channel of player '{}' in room '{}'",
                    member.player_id,
                    self.id
                );
                continue;
            }
            if let Err(e) = member.channel.send(frame.clone()) {
                tracing::warn!(
                    "Failed to push frame to player '{}' in room '{}': {}",
                    member.player_id,
                    self.id,
                    e
                );
            }
        }
    }
}

/// Process-wide mapping from session identifier to [`Room`].
///
/// Entries are added on first join and removed when a room empties; the
/// table lives for the server process's lifetime.
#[derive(Default)]
pub struct RoomTable {
    rooms: HashMap<RoomId, Room>,
}

impl RoomTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the room for `id`, creating an empty one if absent.
    pub fn get_or_create(&mut self, id: RoomId) -> &mut Room {
        self.rooms
            .entry(id.clone())
            .or_insert_with(|| Room::new(id))
    }

    pub fn get(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn get_mut(&mut self, id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    /// Remove the entry; no-op if absent.
    pub fn delete(&mut self, id: &RoomId) {
        self.rooms.remove(id);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
