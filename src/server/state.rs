//! Shared server state.

use tokio::sync::Mutex;

use crate::relay::SessionRouter;

/// Shared application state.
///
/// The router is the only shared mutable state in the process. One lock
/// covers both of its tables so that read-modify-write sequences (check
/// membership then add; broadcast then remove then maybe delete the room)
/// stay atomic with respect to concurrent joins and disconnects.
pub struct AppState {
    pub router: Mutex<SessionRouter>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            router: Mutex::new(SessionRouter::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
