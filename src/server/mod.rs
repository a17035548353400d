//! HTTP/WebSocket surface of the relay server.

mod handler;
mod runner;
mod signal;
mod state;

pub use runner::{build_app, run_server};
pub use state::AppState;
