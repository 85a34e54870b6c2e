//! Error types for the analysis client
//!
//! Every request resolves exactly once, either with its result or with one
//! of these errors. Only [`AnalysisError::Server`] originates from the
//! server itself; the rest describe the connection or the local decode.

use dartanalysis_protocol::{ProtocolError, RequestError};
use dartanalysis_transport::TransportError;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur in client operations
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The server answered the request with an error response
    #[error("Server error {code}: {message}")]
    Server {
        /// Server error code
        code: i64,
        /// Server error message
        message: String,
    },

    /// The connection ended before the request was answered, or had
    /// already ended when it was sent
    #[error("Connection to the analysis server closed")]
    ConnectionClosed,

    /// The service was disposed; nothing was sent
    #[error("Analysis service has been disposed")]
    Disposed,

    /// The result did not match the command's result shape
    #[error("Failed to decode result: {0}")]
    Decode(String),

    /// Writing to the server failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Building a request failed
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalysisError {
    /// Whether this error means the connection is gone for good
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::Disposed)
    }

    /// Server error code, for [`AnalysisError::Server`]
    pub fn server_code(&self) -> Option<i64> {
        match self {
            Self::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<RequestError> for AnalysisError {
    fn from(err: RequestError) -> Self {
        Self::Server {
            code: err.code,
            message: err.message,
        }
    }
}
