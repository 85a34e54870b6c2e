//! The analysis service facade
//!
//! [`AnalysisService`] is the public face of the client: one method per
//! server command, one stream per notification category, and the service
//! lifecycle.
//!
//! # Module Organization
//!
//! - [`core`] - the service struct, construction, generic send and lifecycle
//! - [`commands`] - typed wrappers for each server command
//! - [`notifications`] - per-topic notification streams
//!
//! # Examples
//!
//! ```no_run
//! # use dartanalysis::{AnalysisService, ServiceConfig};
//! # use dartanalysis::protocol::AnalysisSubscription;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = AnalysisService::launch(ServiceConfig::new("/opt/dart-sdk", "/opt/server.dart"))?;
//! let mut highlights = service.analysis_highlights();
//!
//! service.set_analysis_roots(["/proj"], Vec::<String>::new()).await?;
//! service.set_subscriptions(&[AnalysisSubscription::Highlights], &["/proj"]).await?;
//!
//! if let Some(Ok(notification)) = highlights.recv().await {
//!     println!("{} regions in {}", notification.regions.len(), notification.file);
//! }
//!
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod core;
pub mod notifications;

pub use self::core::AnalysisService;
