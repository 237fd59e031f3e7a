//! Session layer for Cardlink.
//!
//! This crate turns the server's command stream into room and match state:
//!
//! 1. **Login** ([`LoginFlow`]): the optional gateway handshake that yields
//!    a [`SessionContext`]
//! 2. **Session** ([`SessionMachine`]): the single owner of the room, the
//!    board and the lobby directory, driven by transport events and ticks
//! 3. **View** ([`View`], [`ViewEvent`]): what the machine tells the
//!    presentation layer
//!
//! # How it fits in the stack
//!
//! ```text
//! View (above)  ← receives ViewEvents, calls outbound actions
//!     ↕
//! Session Layer (this crate)  ← owns RoomState + MatchEngine
//!     ↕
//! Transport / Protocol (below)  ← LineEvent, DatagramEvent, Outbound
//! ```
//!
//! Nothing here is shared between threads. The consumer drains the
//! dispatch queues and feeds each event to the machine with `&mut self`.

mod context;
mod error;
mod login;
mod machine;
mod positions;
mod view;

pub use context::SessionContext;
pub use error::SessionError;
pub use login::{LoginFlow, LoginState, LoginStep};
pub use machine::{SessionMachine, SessionSettings, SessionStatus};
pub use positions::PositionTracker;
pub use view::{View, ViewEvent};
