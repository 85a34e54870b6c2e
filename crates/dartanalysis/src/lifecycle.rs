//! Service lifecycle states
//!
//! A service moves forward only: `Created` while the server process is
//! being wired up, `Running` once the read loop is dispatching, and
//! `Disposed` after [`crate::AnalysisService::dispose`]. There is no way
//! back from `Disposed`; launch a new service instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a service is in its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// Transport exists, read loop not yet started
    Created,

    /// Requests and notifications are flowing
    Running,

    /// Torn down; every request fails with `Disposed`
    Disposed,
}

impl ServiceState {
    /// Whether moving to `next` goes forward
    pub fn can_transition_to(self, next: ServiceState) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Running)
                | (Self::Created, Self::Disposed)
                | (Self::Running, Self::Disposed)
        )
    }

    /// Whether the service has been disposed
    pub fn is_disposed(self) -> bool {
        self == Self::Disposed
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Disposed => "disposed",
        };
        f.write_str(name)
    }
}
