//! Error types for protocol operations
//!
//! Provides error types for serialization, deserialization, and message classification.

use std::fmt;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur during protocol operations
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// JSON serialization/deserialization error
    SerializationError(String),

    /// Line is valid JSON but neither a response nor a notification
    UnrecognizedMessage(String),

    /// Notification params did not match the payload shape for its event
    InvalidPayload {
        /// The event name the payload arrived under.
        event: String,
        /// Decoder message.
        reason: String,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Self::UnrecognizedMessage(msg) => write!(f, "Unrecognized message: {}", msg),
            Self::InvalidPayload { event, reason } => {
                write!(f, "Invalid payload for {}: {}", event, reason)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
