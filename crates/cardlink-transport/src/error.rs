use std::io;
use std::time::Duration;

/// Errors that can occur in the transport layer.
///
/// Every variant except [`Closed`](TransportError::Closed) is produced at
/// most once per connection: after it, the connection is closed and a
/// single `Closed` event has been queued.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The TCP handshake didn't finish in time.
    #[error("connect to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// Nothing is listening at the address.
    #[error("connect to {addr} refused")]
    ConnectRefused {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Any other connect/bind/resolve failure.
    #[error("connect to {addr} failed: {source}")]
    ConnectError {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Writing to the socket failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] io::Error),

    /// Reading from the socket failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] io::Error),

    /// The connection is closed; nothing more can be sent.
    #[error("connection closed")]
    Closed,
}

impl TransportError {
    /// Classifies a failed connect attempt.
    pub(crate) fn connect(addr: &str, source: io::Error) -> Self {
        let addr = addr.to_string();
        if source.kind() == io::ErrorKind::ConnectionRefused {
            Self::ConnectRefused { addr, source }
        } else {
            Self::ConnectError { addr, source }
        }
    }
}
