//! Commands known to the client
//!
//! One row per server method: name, parameter shape, result shape.

use crate::command::{Empty, NoParams, commands};
use crate::types::{AnalysisErrorInfo, AnalysisSubscription, ContentChange, ServerService};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

commands! {
    /// `server.getVersion`
    ServerGetVersion => "server.getVersion", NoParams => VersionResult;
    /// `server.shutdown`
    ServerShutdown => "server.shutdown", NoParams => Empty;
    /// `server.setSubscriptions`
    ServerSetSubscriptions => "server.setSubscriptions", ServerSubscriptionsParams => Empty;
    /// `analysis.setAnalysisRoots`
    AnalysisSetAnalysisRoots => "analysis.setAnalysisRoots", AnalysisRootsParams => Empty;
    /// `analysis.setPriorityFiles`
    AnalysisSetPriorityFiles => "analysis.setPriorityFiles", PriorityFilesParams => Empty;
    /// `analysis.setSubscriptions`
    AnalysisSetSubscriptions => "analysis.setSubscriptions", AnalysisSubscriptionsParams => Empty;
    /// `analysis.updateContent`
    AnalysisUpdateContent => "analysis.updateContent", UpdateContentParams => Empty;
    /// `analysis.getErrors`
    AnalysisGetErrors => "analysis.getErrors", GetErrorsParams => GetErrorsResult;
}

/// Result of `server.getVersion`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResult {
    /// Server version string
    pub version: String,
}

/// Params of `server.setSubscriptions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSubscriptionsParams {
    /// Services to receive; replaces any previous set
    pub subscriptions: Vec<ServerService>,
}

/// Params of `analysis.setAnalysisRoots`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AnalysisRootsParams {
    /// Folders to analyze
    pub included: Vec<String>,

    /// Folders or files inside `included` to skip
    pub excluded: Vec<String>,
}

/// Params of `analysis.setPriorityFiles`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PriorityFilesParams {
    /// Files to analyze first
    pub files: Vec<String>,
}

/// Params of `analysis.setSubscriptions`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AnalysisSubscriptionsParams {
    /// Files or folders to report on, per service
    pub subscriptions: BTreeMap<AnalysisSubscription, Vec<String>>,
}

impl AnalysisSubscriptionsParams {
    /// Subscribe every service in `services` to every path in `roots`
    pub fn grouped<S: AsRef<str>>(services: &[AnalysisSubscription], roots: &[S]) -> Self {
        let roots: Vec<String> = roots.iter().map(|r| r.as_ref().to_string()).collect();
        Self {
            subscriptions: services.iter().map(|s| (*s, roots.clone())).collect(),
        }
    }
}

/// Params of `analysis.updateContent`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UpdateContentParams {
    /// Overlay change per file path
    pub files: BTreeMap<String, ContentChange>,
}

/// Params of `analysis.getErrors`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetErrorsParams {
    /// File to report on
    pub file: String,
}

/// Result of `analysis.getErrors`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetErrorsResult {
    /// Current diagnostics for the file
    pub errors: Vec<AnalysisErrorInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use serde_json::json;

    #[test]
    fn test_method_names_are_unique() {
        let mut methods = METHODS.to_vec();
        methods.sort_unstable();
        methods.dedup();
        assert_eq!(methods.len(), METHODS.len());
    }

    #[test]
    fn test_grouped_subscriptions() {
        let params = AnalysisSubscriptionsParams::grouped(
            &[AnalysisSubscription::Highlights, AnalysisSubscription::Outline],
            &["/proj"],
        );

        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({ "subscriptions": { "HIGHLIGHTS": ["/proj"], "OUTLINE": ["/proj"] } })
        );
    }

    #[test]
    fn test_grouped_subscriptions_without_services() {
        let params = AnalysisSubscriptionsParams::grouped::<&str>(&[], &["/a", "/b"]);
        assert!(params.subscriptions.is_empty());
    }

    #[test]
    fn test_table_rows() {
        assert_eq!(AnalysisSetSubscriptions::METHOD, "analysis.setSubscriptions");
        assert_eq!(ServerGetVersion::METHOD, "server.getVersion");
        assert!(METHODS.contains(&"analysis.getErrors"));
    }

    #[test]
    fn test_server_subscriptions_params() {
        let params = ServerSubscriptionsParams {
            subscriptions: vec![ServerService::Status],
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({ "subscriptions": ["STATUS"] })
        );
    }
}
