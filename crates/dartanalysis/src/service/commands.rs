//! Typed server commands
//!
//! Thin wrappers over [`AnalysisService::send`], one per entry in the
//! command table.

use crate::error::Result;
use crate::service::core::AnalysisService;
use dartanalysis_protocol::commands::{
    AnalysisGetErrors, AnalysisRootsParams, AnalysisSetAnalysisRoots, AnalysisSetPriorityFiles,
    AnalysisSetSubscriptions, AnalysisSubscriptionsParams, AnalysisUpdateContent,
    GetErrorsParams, PriorityFilesParams, ServerGetVersion, ServerSetSubscriptions,
    ServerSubscriptionsParams, UpdateContentParams,
};
use dartanalysis_protocol::types::{AnalysisErrorInfo, ContentChange};
use dartanalysis_protocol::{AnalysisSubscription, NoParams, ServerService};
use std::collections::BTreeMap;

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl AnalysisService {
    /// Version string of the running server
    pub async fn get_version(&self) -> Result<String> {
        let result = self.send::<ServerGetVersion>(&NoParams {}).await?;
        Ok(result.version)
    }

    /// Choose which server-level notifications to receive
    pub async fn set_server_subscriptions(&self, services: &[ServerService]) -> Result<()> {
        let params = ServerSubscriptionsParams {
            subscriptions: services.to_vec(),
        };
        self.send::<ServerSetSubscriptions>(&params).await?;
        Ok(())
    }

    /// Set the folders to analyze
    ///
    /// Replaces the previous roots. `excluded` may name folders or files
    /// inside the included ones.
    pub async fn set_analysis_roots<I, E, S, T>(&self, included: I, excluded: E) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let params = AnalysisRootsParams {
            included: strings(included),
            excluded: strings(excluded),
        };
        self.send::<AnalysisSetAnalysisRoots>(&params).await?;
        Ok(())
    }

    /// Set the files the server should analyze first
    pub async fn set_priority_files<I, S>(&self, files: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let params = PriorityFilesParams {
            files: strings(files),
        };
        self.send::<AnalysisSetPriorityFiles>(&params).await?;
        Ok(())
    }

    /// Subscribe every service in `services` to every path in `roots`
    ///
    /// Issues a single `analysis.setSubscriptions` request. Like every
    /// subscription change it replaces what was set before.
    pub async fn set_subscriptions<S: AsRef<str>>(
        &self,
        services: &[AnalysisSubscription],
        roots: &[S],
    ) -> Result<()> {
        let params = AnalysisSubscriptionsParams::grouped(services, roots);
        self.send::<AnalysisSetSubscriptions>(&params).await?;
        Ok(())
    }

    /// Set subscriptions from an explicit per-service map
    pub async fn set_subscription_map(
        &self,
        subscriptions: BTreeMap<AnalysisSubscription, Vec<String>>,
    ) -> Result<()> {
        let params = AnalysisSubscriptionsParams { subscriptions };
        self.send::<AnalysisSetSubscriptions>(&params).await?;
        Ok(())
    }

    /// Add, change or remove overlays for unsaved file contents
    pub async fn update_content(&self, files: BTreeMap<String, ContentChange>) -> Result<()> {
        let params = UpdateContentParams { files };
        self.send::<AnalysisUpdateContent>(&params).await?;
        Ok(())
    }

    /// Overlay one file with `content`
    pub async fn add_overlay(&self, file: impl Into<String>, content: impl Into<String>) -> Result<()> {
        let change = ContentChange::Add {
            content: content.into(),
        };
        self.update_content(BTreeMap::from([(file.into(), change)])).await
    }

    /// Drop the overlay of one file
    pub async fn remove_overlay(&self, file: impl Into<String>) -> Result<()> {
        self.update_content(BTreeMap::from([(file.into(), ContentChange::Remove)]))
            .await
    }

    /// Current diagnostics for `file`
    ///
    /// The file must be inside an analysis root.
    pub async fn get_errors(&self, file: impl Into<String>) -> Result<Vec<AnalysisErrorInfo>> {
        let params = GetErrorsParams { file: file.into() };
        let result = self.send::<AnalysisGetErrors>(&params).await?;
        Ok(result.errors)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::RecordingTransport;
    use crate::AnalysisService;
    use dartanalysis_protocol::{AnalysisSubscription, ServerService};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn service() -> (AnalysisService, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        transport.auto_respond(json!({}));
        let service = AnalysisService::with_transport(transport.clone()).unwrap();
        (service, transport)
    }

    #[tokio::test]
    async fn test_server_subscriptions() {
        let (service, transport) = service();

        service
            .set_server_subscriptions(&[ServerService::Status])
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0]["method"], "server.setSubscriptions");
        assert_eq!(sent[0]["params"], json!({ "subscriptions": ["STATUS"] }));
    }

    #[tokio::test]
    async fn test_set_subscriptions_groups_topics_under_roots() {
        let (service, transport) = service();

        service
            .set_subscriptions(
                &[AnalysisSubscription::Highlights, AnalysisSubscription::Outline],
                &["/proj", "/lib"],
            )
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["method"], "analysis.setSubscriptions");
        assert_eq!(
            sent[0]["params"],
            json!({
                "subscriptions": {
                    "HIGHLIGHTS": ["/proj", "/lib"],
                    "OUTLINE": ["/proj", "/lib"]
                }
            })
        );
    }

    #[tokio::test]
    async fn test_set_subscription_map() {
        let (service, transport) = service();

        let map = BTreeMap::from([
            (AnalysisSubscription::Navigation, vec!["/proj/a.dart".to_string()]),
        ]);
        service.set_subscription_map(map).await.unwrap();

        assert_eq!(
            transport.sent()[0]["params"]["subscriptions"],
            json!({ "NAVIGATION": ["/proj/a.dart"] })
        );
    }

    #[tokio::test]
    async fn test_analysis_roots_and_priority_files() {
        let (service, transport) = service();

        service
            .set_analysis_roots(["/proj"], ["/proj/build"])
            .await
            .unwrap();
        service.set_priority_files(["/proj/lib/main.dart"]).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0]["method"], "analysis.setAnalysisRoots");
        assert_eq!(
            sent[0]["params"],
            json!({ "included": ["/proj"], "excluded": ["/proj/build"] })
        );
        assert_eq!(sent[1]["method"], "analysis.setPriorityFiles");
        assert_eq!(sent[1]["params"], json!({ "files": ["/proj/lib/main.dart"] }));
    }

    #[tokio::test]
    async fn test_overlays() {
        let (service, transport) = service();

        service.add_overlay("/proj/a.dart", "void main() {}").await.unwrap();
        service.remove_overlay("/proj/a.dart").await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0]["method"], "analysis.updateContent");
        assert_eq!(
            sent[0]["params"]["files"]["/proj/a.dart"],
            json!({ "type": "add", "content": "void main() {}" })
        );
        assert_eq!(
            sent[1]["params"]["files"]["/proj/a.dart"],
            json!({ "type": "remove" })
        );
    }

    #[tokio::test]
    async fn test_get_errors_returns_diagnostics() {
        let transport = Arc::new(RecordingTransport::new());
        transport.auto_respond(json!({
            "errors": [{
                "severity": "ERROR",
                "type": "SYNTACTIC_ERROR",
                "location": {
                    "file": "/proj/a.dart",
                    "offset": 10,
                    "length": 1,
                    "startLine": 1,
                    "startColumn": 11
                },
                "message": "Expected ';'"
            }]
        }));
        let service = AnalysisService::with_transport(transport.clone()).unwrap();

        let errors = service.get_errors("/proj/a.dart").await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Expected ';'");
        assert_eq!(transport.sent()[0]["params"], json!({ "file": "/proj/a.dart" }));
    }
}
