//! Room and match state for Cardlink.
//!
//! Everything here is plain, synchronous data owned by the session's
//! consumer. Nothing spawns tasks or touches sockets; time only moves when
//! the owner calls [`MatchEngine::advance`].
//!
//! # Key types
//!
//! - [`RoomState`]: the one room this client is in, with its two seats
//! - [`MatchEngine`]: the card board, flip rules and opening reveal
//! - [`Timeline`]: tick-driven scheduler for delayed board actions
//! - [`Lobby`]: directory of open rooms built from broadcasts

mod board;
mod error;
mod lobby;
mod state;
mod timeline;

pub use board::{BoardEvent, CardSlot, FlipOutcome, MatchEngine, Reveal};
pub use error::{BoardError, RoomError};
pub use lobby::{Lobby, LobbyEntry};
pub use state::{BoardConfig, Departure, Participant, RoomState};
pub use timeline::Timeline;
