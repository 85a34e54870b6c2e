//! Async client for the Dart Analysis Server
//!
//! Launches the server as a child process and talks to it over
//! newline-delimited JSON on its stdin/stdout. Requests are matched to
//! their responses by id; notifications are fanned out to per-topic
//! streams.
//!
//! # Architecture
//!
//! - **Transport** ([`dartanalysis_transport`]): the process, line framing and the single read loop
//! - **Correlator** ([`correlator`]): request ids and pending requests
//! - **Event router** ([`events`]): notification subscribers
//! - **Service** ([`service`]): typed commands, streams and lifecycle
//!
//! # Example
//!
//! ```no_run
//! use dartanalysis::{AnalysisService, ServiceConfig};
//!
//! # async fn example() -> dartanalysis::Result<()> {
//! let service = AnalysisService::launch(ServiceConfig::new("/opt/dart-sdk", "/opt/server.dart"))?;
//! println!("server {}", service.get_version().await?);
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod correlator;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod routing;
pub mod service;
pub mod testing;

// Re-export commonly used types
pub use config::ServiceConfig;
pub use correlator::{CloseReason, Correlator};
pub use error::{AnalysisError, Result};
pub use events::{EventRouter, EventStream, NotificationError};
pub use lifecycle::ServiceState;
pub use routing::MessageRouter;
pub use service::AnalysisService;

pub use dartanalysis_protocol as protocol;
pub use dartanalysis_transport as transport;
