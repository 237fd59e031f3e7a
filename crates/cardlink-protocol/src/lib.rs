//! Wire protocol for Cardlink.
//!
//! This crate defines the "language" the client and the world server
//! speak on both channels:
//!
//! - **Codec** ([`decode`], [`encode`]): the flat text format
//!   `NAME key1=value1 key2=value2`, one command per line.
//! - **Command** ([`Command`]): a decoded `name + fields` unit.
//! - **Typed commands** ([`Inbound`], [`GatewayReply`], [`PositionUpdate`],
//!   [`Outbound`]): closed enums over the fixed command set, so adding or
//!   removing a command is a compile-time-checked change.
//! - **Errors** ([`ProtocolError`]): what can go wrong when a decoded
//!   command is turned into a typed one.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw lines) and session
//! (room state). It doesn't know about sockets or rooms. It only knows how
//! to turn text into commands and back.
//!
//! ```text
//! Transport (lines) → Protocol (Command → Inbound) → Session (RoomState)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod command;
mod error;
mod inbound;
pub mod names;
mod outbound;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{decode, encode, sanitize_value};
pub use command::Command;
pub use error::ProtocolError;
pub use inbound::{FlipReport, GatewayReply, Inbound, PositionUpdate, WorldInfo};
pub use outbound::Outbound;
pub use types::{ActorId, Phase, RoomId, Winner};
