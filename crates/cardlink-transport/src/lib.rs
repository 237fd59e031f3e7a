//! Transport layer for Cardlink.
//!
//! Two connections, one per channel:
//!
//! - [`LineConnection`]: TCP, reliable and ordered. One command per
//!   `\n`-terminated line. Carries everything except movement.
//! - [`DatagramConnection`]: UDP, unreliable. Carries `MOVE` out and
//!   `ACTOR_POS` in.
//!
//! Both run their socket I/O on background tokio tasks and hand decoded
//! events to the consumer through a [`Dispatcher`](cardlink_tick::Dispatcher).
//! They never call consumer code directly.
//!
//! # Lifecycle
//!
//! ```text
//! Connecting ──connect ok──→ Connected ──close / EOF / error──→ Closed
//! ```
//!
//! `Closed` is terminal. Whichever path gets there first (local
//! [`close`](Connection::close), the peer hanging up, or an I/O error)
//! queues the one and only `Closed { reason }` event for the connection.

mod datagram;
mod error;
mod lifecycle;
mod line;

pub use datagram::{DatagramConnection, DatagramEvent};
pub use error::TransportError;
pub use line::{LineConnection, LineEvent};

use std::fmt;

/// Opaque identifier for a connection, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Closed,
}

/// Why a connection reached [`ConnectionState::Closed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// [`Connection::close`] was called.
    LocalClose,
    /// The peer closed its end (EOF).
    PeerClosed,
    /// A socket error ended the connection.
    Error(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalClose => f.write_str("closed locally"),
            Self::PeerClosed => f.write_str("closed by peer"),
            Self::Error(e) => write!(f, "i/o error: {e}"),
        }
    }
}

/// The outbound half of a connection, as the session layer sees it.
///
/// Every method is synchronous and non-blocking so the consumer can call
/// them from inside a drain without awaiting. Object-safe: the session
/// holds an `Arc<dyn Connection>` and tests substitute a recorder.
pub trait Connection: Send + Sync + 'static {
    /// Queues one line (without the trailing `\n`) for sending.
    ///
    /// # Errors
    /// [`TransportError::Closed`] once the connection is closed.
    fn send_line(&self, line: String) -> Result<(), TransportError>;

    /// Starts shutting the connection down. Idempotent, never blocks, and
    /// safe to call from any thread.
    fn close(&self);

    fn state(&self) -> ConnectionState;

    fn id(&self) -> ConnectionId;

    fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(7).into_inner(), 7);
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(CloseReason::PeerClosed.to_string(), "closed by peer");
        assert_eq!(
            CloseReason::Error("reset".into()).to_string(),
            "i/o error: reset"
        );
    }
}
