//! The read loop
//!
//! One task per connection reads the server's stdout line by line, decodes
//! each line and dispatches it in arrival order. Lines that fail to decode
//! are logged and dropped; only end of stream or a read error ends the loop.

use crate::traits::MessageHandler;
use dartanalysis_protocol::IncomingMessage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Run the read loop to completion, then signal the closed connection
pub async fn run_read_loop<R>(reader: R, handler: Arc<dyn MessageHandler>, connected: Arc<AtomicBool>)
where
    R: AsyncRead + Unpin,
{
    read_loop(reader, handler.as_ref()).await;
    connected.store(false, Ordering::SeqCst);
    handler.connection_closed();
}

/// Read and dispatch lines until the stream ends
pub async fn read_loop<R>(reader: R, handler: &dyn MessageHandler)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                tracing::debug!("server stream closed");
                break;
            }
            Ok(_) => {
                dispatch_line(&buf, handler);
            }
            Err(e) => {
                tracing::warn!(error = %e, "error reading from server");
                break;
            }
        }
    }
}

/// Decode one raw line and hand it to the handler
///
/// Returns whether the line produced a message.
pub fn dispatch_line(raw: &[u8], handler: &dyn MessageHandler) -> bool {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(e) => {
            tracing::warn!(error = %e, "dropping non-UTF-8 line from server");
            return false;
        }
    };
    if line.is_empty() {
        return false;
    }

    match IncomingMessage::from_line(line) {
        Ok(message) => {
            tracing::trace!(line, "received");
            handler.handle_message(message);
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, line, "dropping undecodable line from server");
            false
        }
    }
}
