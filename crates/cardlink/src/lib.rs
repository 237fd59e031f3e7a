//! # Cardlink
//!
//! Network session layer for a two-player card-matching game client.
//!
//! Cardlink connects to an authoritative world server over two channels,
//! a reliable TCP control channel and an unreliable UDP positional
//! channel, and keeps a local mirror of the room and the card board in
//! step with the server's commands. The presentation layer implements
//! [`View`] and calls the session's outbound actions; everything in
//! between is handled here.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardlink::prelude::*;
//!
//! # async fn run() -> Result<(), CardlinkError> {
//! let config = ClientConfig::load("client.json")?;
//! let mut client = Client::<Vec<ViewEvent>>::builder()
//!     .config(config)
//!     .connect(Vec::<ViewEvent>::new())
//!     .await?;
//! client.run_until_closed().await
//! # }
//! ```

mod client;
mod config;
mod error;

pub use client::{Client, ClientBuilder, PumpReport, login};
pub use config::ClientConfig;
pub use error::CardlinkError;

pub mod prelude {
    pub use crate::{Client, ClientBuilder, ClientConfig, CardlinkError, PumpReport, login};

    pub use cardlink_protocol::{ActorId, Phase, PositionUpdate, RoomId, WorldInfo, Winner};
    pub use cardlink_room::{CardSlot, LobbyEntry, RoomState};
    pub use cardlink_session::{
        SessionContext, SessionError, SessionMachine, SessionSettings, SessionStatus, View,
        ViewEvent,
    };
    pub use cardlink_tick::{TickConfig, TickPolicy};
    pub use cardlink_transport::CloseReason;
}
