//! Unified error type for the Cardlink client.

use std::time::Duration;

use cardlink_protocol::ProtocolError;
use cardlink_room::{BoardError, RoomError};
use cardlink_session::SessionError;
use cardlink_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` variants let `?` lift any layer's error into this one.
#[derive(Debug, thiserror::Error)]
pub enum CardlinkError {
    /// Connect, send or receive failed on a channel.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A command couldn't be interpreted.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session action was refused, or login failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Board(#[from] BoardError),

    /// The configuration couldn't be read or parsed.
    #[error("config: {0}")]
    Config(String),

    /// The gateway didn't answer in time.
    #[error("login timed out after {0:?}")]
    LoginTimeout(Duration),

    /// The gateway offered no world, or none was chosen.
    #[error("no world to enter")]
    NoWorld,
}
