//! Error types for the protocol layer.
//!
//! Decoding a line never fails. Garbage degrades to a command with no
//! fields. Errors only appear one step later, when a [`Command`] is
//! converted into a typed [`Inbound`] and a required field is missing or
//! doesn't parse.
//!
//! [`Command`]: crate::Command
//! [`Inbound`]: crate::Inbound

/// Errors that can occur when interpreting a decoded command.
///
/// All of these are recoverable: the session logs them and drops the
/// command, and the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The command name isn't one this client understands.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// A field the command requires was not present.
    #[error("{command}: missing field {field:?}")]
    MissingField {
        command: String,
        field: &'static str,
    },

    /// A field was present but its value couldn't be parsed
    /// (e.g. `index=abc` where a number is expected).
    #[error("{command}: invalid value {value:?} for field {field:?}")]
    InvalidField {
        command: String,
        field: &'static str,
        value: String,
    },
}
