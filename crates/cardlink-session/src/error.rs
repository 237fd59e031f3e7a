//! Error types for the session layer.

use cardlink_protocol::{Phase, ProtocolError, RoomId};
use cardlink_room::{BoardError, RoomError};
use cardlink_transport::TransportError;

/// Errors from the session machine and the login flow.
///
/// The guard variants come back from outbound actions whose preconditions
/// don't hold; nothing is sent in that case. The wrapped variants surface
/// from inbound handling, where the consumer logs and drops them.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The control connection is closed; the session is over.
    #[error("session is not connected")]
    NotConnected,

    #[error("not in a room")]
    NotInRoom,

    /// Creating or entering a room while already seated in one.
    #[error("already in room {0}")]
    AlreadyInRoom(RoomId),

    /// Only the room master may do this.
    #[error("only the room master can do that")]
    NotMaster,

    /// Only the challenger may do this.
    #[error("only the challenger can do that")]
    NotChallenger,

    #[error("not your turn")]
    NotYourTurn,

    /// The room's phase doesn't allow the action.
    #[error("not allowed while the room is {0}")]
    WrongPhase(Phase),

    /// The master tried to start before a ready challenger was seated.
    #[error("challenger is not ready")]
    ChallengerNotReady,

    #[error("invalid board dimensions {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    /// The gateway rejected the login because the id is already in use.
    #[error("id is already logged in")]
    DuplicateId,

    /// The gateway sent a reply that doesn't fit the login step.
    #[error("unexpected gateway reply {0}")]
    UnexpectedReply(String),

    /// The chosen world wasn't in the gateway's list.
    #[error("unknown world {0:?}")]
    UnknownWorld(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
