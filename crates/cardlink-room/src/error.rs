//! Error types for the room layer.

use cardlink_protocol::{ActorId, Phase, RoomId};

/// Errors from [`RoomState`](crate::RoomState) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Both seats are taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The actor isn't one of the room's members.
    #[error("actor {0} not in room {1}")]
    NotInRoom(ActorId, RoomId),

    /// A command addressed a different room than the one we're in.
    #[error("command for room {got} but current room is {expected}")]
    RoomMismatch { expected: RoomId, got: RoomId },

    /// The phase change isn't allowed from the current phase.
    #[error("cannot move from {from} to {to}")]
    InvalidPhase { from: Phase, to: Phase },
}

/// Errors from [`MatchEngine`](crate::MatchEngine) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("slot {index} out of range (board has {len} slots)")]
    IndexOutOfRange { index: usize, len: usize },

    /// The slot is already face up and locked.
    #[error("slot {0} is locked")]
    SlotLocked(usize),

    /// The second flip of a pair named the pending slot again.
    #[error("slot {0} is already the pending flip")]
    SameSlot(usize),

    /// The opening reveal is still running; the board isn't interactive.
    #[error("opening sequence in progress")]
    OpeningInProgress,

    /// Zero, odd, overflowing or oversized `rows × cols`.
    #[error("invalid board dimensions {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    /// The deck for the opening reveal doesn't fit the board.
    #[error("deck has {got} cards but board has {expected} slots")]
    DeckSizeMismatch { expected: usize, got: usize },
}
