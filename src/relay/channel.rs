//! Outbound half of a client connection.
//!
//! The WebSocket itself lives in the UI layer (`server::handler`), which
//! splits it and drains a per-connection mpsc channel into the sink. The
//! relay core only ever sees this sender wrapper, so the transport can be
//! swapped (or faked in tests) without touching the room logic.

use thiserror::Error;
use tokio::sync::mpsc;

/// Error returned when a push to a client channel fails.
#[derive(Debug, Error)]
pub enum PushError {
    /// The receiving end of the channel is gone.
    #[error("channel closed: {0}")]
    Closed(String),
}

/// Cloneable handle for pushing text frames to one client.
#[derive(Debug, Clone)]
pub struct RelayChannel {
    sender: mpsc::UnboundedSender<String>,
}

impl RelayChannel {
    pub fn new(sender: mpsc::UnboundedSender<String>) -> Self {
        Self { sender }
    }

    /// Whether the connection's pusher loop has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Push one text frame to the client.
    pub fn send(&self, frame: String) -> Result<(), PushError> {
        self.sender
            .send(frame)
            .map_err(|e| PushError::Closed(e.to_string()))
    }
}
