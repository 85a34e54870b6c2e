//! Stdio transport for the Dart Analysis Server
//!
//! Owns the server process and its standard streams. Outgoing messages are
//! written one JSON object per line; a single read loop decodes incoming
//! lines and hands each one to a [`MessageHandler`].
//!
//! # Architecture
//!
//! - **Transport trait**: the write side as seen by the request correlator
//! - **MessageHandler trait**: the read side's dispatch target
//! - **Subprocess transport**: process spawning and stdio framing
//! - **Read loop**: line decoding, classification, connection-closed signal
//! - **Write loop**: one task owning stdin, writing whole lines only

#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! # Usage
//!
//! ```ignore
//! use dartanalysis_transport::{ProcessConfig, StdioTransport, Transport};
//!
//! let transport = StdioTransport::spawn(ProcessConfig::new("/sdk/bin/dart").with_arg(script))?;
//! transport.start(handler)?;
//! transport.send_message(serde_json::json!({"id": "1", "method": "server.getVersion"})).await?;
//! ```

pub mod error;
pub mod reader;
pub mod subprocess;
pub mod traits;
pub mod writer;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use subprocess::{ProcessConfig, StderrMode, StdioTransport};
pub use traits::{MessageHandler, Transport};
