//! Connection/session management and message-relay core.
//!
//! Three pieces, composed bottom-up:
//!
//! - [`registry::ChannelRegistry`]: live connections and their identities
//! - [`room::RoomTable`] / [`room::Room`]: two-player sessions
//! - [`router::SessionRouter`]: the dispatch state machine owning both

pub mod channel;
pub mod registry;
pub mod room;
pub mod router;

pub use channel::RelayChannel;
pub use registry::{ChannelRegistry, ClientInfo, ConnectionId};
pub use room::{PlayerId, Room, RoomId, RoomTable};
pub use router::SessionRouter;
