use core::fmt;
use std::error::Error;

/// Why an inbound message or a configured origin was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// The data is not an envelope `{type, payload}`.
    Envelope(String),
    /// The envelope names a message type this engine does not know.
    UnknownType(String),
    /// The payload does not match the shape its message type requires.
    Payload { kind: String, reason: String },
    /// The configured host origin is not a valid tuple origin.
    InvalidOrigin(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Envelope(reason) => write!(f, "malformed message envelope: {reason}"),
            Self::UnknownType(kind) => write!(f, "unknown message type {kind:?}"),
            Self::Payload { kind, reason } => write!(f, "malformed {kind} payload: {reason}"),
            Self::InvalidOrigin(origin) => write!(f, "invalid host origin {origin:?}"),
        }
    }
}

impl Error for ProtocolError {}
