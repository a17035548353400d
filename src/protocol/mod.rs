//! Wire message envelope for the relay protocol.
//!
//! Every frame is a JSON object with a `type` discriminator. Inbound and
//! outbound envelopes are modeled as closed tagged unions; an inbound frame
//! whose discriminator is unknown (or whose required fields are missing)
//! decodes to [`ClientEvent::Unrecognized`] so the router can drop it
//! without treating it as a transport error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when an inbound frame cannot be decoded at all.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not valid JSON. The frame is discarded; the connection
    /// stays open.
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Inbound event sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Request to join (or create) a room as the given player.
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String, player_id: String },
    /// Chat line to relay to the room. The sender's player id is taken from
    /// the registry, never from the payload.
    #[serde(rename_all = "camelCase")]
    Chat { display_name: String, message: String },
    /// The sender finished its turn.
    ActionComplete,
    /// The sender declares the game over.
    GameOver,
    /// Valid JSON that is not a recognized event. Ignored by the router.
    #[serde(other)]
    Unrecognized,
}

/// Outbound event generated by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The room reached two members; the session can start.
    GameStarted,
    /// Relayed chat line.
    #[serde(rename_all = "camelCase")]
    Chat {
        player_id: String,
        display_name: String,
        message: String,
    },
    /// A player finished its turn.
    #[serde(rename_all = "camelCase")]
    ActionComplete { player_id: String },
    /// A player declared the game over.
    #[serde(rename_all = "camelCase")]
    GameOver { player_id: String },
    /// A player's connection closed.
    #[serde(rename_all = "camelCase")]
    Disconnect { player_id: String },
}

impl ServerEvent {
    /// Serialize this event to its wire frame.
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).expect("server events serialize to JSON")
    }
}

/// Decode an inbound text frame.
///
/// Frames that are not valid JSON are a [`DecodeError`]; valid JSON that
/// does not match a recognized event shape becomes
/// [`ClientEvent::Unrecognized`].
pub fn decode_frame(text: &str) -> Result<ClientEvent, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    Ok(serde_json::from_value(value).unwrap_or(ClientEvent::Unrecognized))
}
