//! Wire types for the Dart Analysis Server protocol
//!
//! This crate holds the pure data side of the client: the JSON envelopes that
//! travel over the server's stdin/stdout, the table of known commands and the
//! payload shapes of every notification the client understands.
//!
//! # Type Organization
//!
//! - **Envelopes**: [`envelope`] - request ids, outgoing requests, incoming message classification
//! - **Commands**: [`command`] and [`commands`] - the method name / params / result table
//! - **Notifications**: [`notifications`] - topics and their payloads
//! - **Shared shapes**: [`types`] - locations, elements, errors, highlight regions
//! - **Error types**: [`error`] - protocol errors
//!
//! # Design Principles
//!
//! - **Zero I/O**: all types are pure data structures
//! - **Serialization**: serde-based, camelCase on the wire
//! - **Forward compatible**: unknown notification events are not errors

#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! # Usage
//!
//! ```
//! use dartanalysis_protocol::IncomingMessage;
//!
//! let message = IncomingMessage::from_line(r#"{"id":"1","result":{}}"#).unwrap();
//! assert!(matches!(message, IncomingMessage::Response(_)));
//! ```

pub mod command;
pub mod commands;
pub mod envelope;
pub mod error;
pub mod notifications;
pub mod types;

// Re-export commonly used types at crate level
pub use command::{Command, Empty, NoParams};
pub use envelope::{IncomingMessage, NotificationMessage, Request, RequestError, RequestId, ResponseMessage};
pub use error::{ProtocolError, Result};
pub use notifications::{Notification, Topic, TopicPayload};
pub use types::{AnalysisSubscription, ServerService};
