//! Two-player WebSocket relay library.
//!
//! Pairs exactly two remote participants into a shared room and forwards
//! structured game events between them without interpreting their payloads.

// core relay logic
pub mod protocol;
pub mod relay;

// HTTP/WebSocket surface
pub mod server;

// shared library
pub mod common;
