//! Transport seams
//!
//! [`Transport`] is what the request side writes to; [`MessageHandler`] is
//! what the read loop dispatches to. Keeping both as traits lets the client
//! run over a real process, an in-memory pipe, or a recording fake.

use crate::error::Result;
use async_trait::async_trait;
use dartanalysis_protocol::IncomingMessage;
use serde_json::Value;
use std::sync::Arc;

/// Receives everything the read loop decodes
///
/// Called from the single read loop, in wire order. Implementations must
/// not block.
pub trait MessageHandler: Send + Sync + 'static {
    /// A decoded response or notification
    fn handle_message(&self, message: IncomingMessage);

    /// The connection ended; called exactly once per read loop
    fn connection_closed(&self);
}

/// Line-oriented JSON transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start the read loop, dispatching to `handler`
    ///
    /// # Errors
    ///
    /// Returns [`crate::TransportError::AlreadyStarted`] on a second call.
    fn start(&self, handler: Arc<dyn MessageHandler>) -> Result<()>;

    /// Write one message as a single line
    ///
    /// Concurrent callers never interleave within a line.
    async fn send_message(&self, message: Value) -> Result<()>;

    /// Check if the connection is still open
    async fn is_connected(&self) -> bool;

    /// Close the connection and stop the server process
    async fn close(&self) -> Result<()>;
}
