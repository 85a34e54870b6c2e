//! Notification streams
//!
//! Each accessor opens a fresh, independent subscription. Notifications
//! that arrived before the call are not replayed.

use crate::events::EventStream;
use crate::service::core::AnalysisService;
use dartanalysis_protocol::notifications::{
    AnalysisErrorsNotification, AnalysisHighlightsNotification, AnalysisNavigationNotification,
    AnalysisOutlineNotification, ServerConnectedNotification, ServerErrorNotification,
    ServerStatusNotification,
};

impl AnalysisService {
    /// `server.connected`: sent once when the server starts
    ///
    /// Subscribe before the server gets a chance to send it, i.e. right
    /// after launch, or it is missed.
    pub fn server_connected(&self) -> EventStream<ServerConnectedNotification> {
        self.subscribe()
    }

    /// `server.status`: analysis progress
    pub fn server_status(&self) -> EventStream<ServerStatusNotification> {
        self.subscribe()
    }

    /// `server.error`: internal server failures
    pub fn server_error(&self) -> EventStream<ServerErrorNotification> {
        self.subscribe()
    }

    /// `analysis.errors`: diagnostics per file
    pub fn analysis_errors(&self) -> EventStream<AnalysisErrorsNotification> {
        self.subscribe()
    }

    /// `analysis.highlights`
    pub fn analysis_highlights(&self) -> EventStream<AnalysisHighlightsNotification> {
        self.subscribe()
    }

    /// `analysis.navigation`
    pub fn analysis_navigation(&self) -> EventStream<AnalysisNavigationNotification> {
        self.subscribe()
    }

    /// `analysis.outline`
    pub fn analysis_outline(&self) -> EventStream<AnalysisOutlineNotification> {
        self.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::RecordingTransport;
    use crate::AnalysisService;
    use dartanalysis_protocol::Topic;
    use futures::StreamExt;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_each_accessor_subscribes_its_topic() {
        let service = AnalysisService::with_transport(Arc::new(RecordingTransport::new())).unwrap();

        assert_eq!(service.server_connected().topic(), Topic::ServerConnected);
        assert_eq!(service.server_status().topic(), Topic::ServerStatus);
        assert_eq!(service.server_error().topic(), Topic::ServerError);
        assert_eq!(service.analysis_errors().topic(), Topic::AnalysisErrors);
        assert_eq!(service.analysis_highlights().topic(), Topic::AnalysisHighlights);
        assert_eq!(service.analysis_navigation().topic(), Topic::AnalysisNavigation);
        assert_eq!(service.analysis_outline().topic(), Topic::AnalysisOutline);
    }

    #[tokio::test]
    async fn test_navigation_targets_resolve() {
        let transport = Arc::new(RecordingTransport::new());
        let service = AnalysisService::with_transport(transport.clone()).unwrap();
        let mut navigation = service.analysis_navigation();

        transport.inject_line(
            r#"{"event":"analysis.navigation","params":{
                "file":"/proj/a.dart",
                "regions":[{"offset":0,"length":4,"targets":[0]}],
                "targets":[{"kind":"CLASS","fileIndex":0,"offset":6,"length":3,"startLine":1,"startColumn":7}],
                "files":["/proj/b.dart"]}}"#,
        );

        let notification = navigation.next().await.unwrap().unwrap();
        let resolved: Vec<_> = notification.resolve(&notification.regions[0]).collect();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, "/proj/b.dart");
        assert_eq!(resolved[0].1.offset, 6);
    }
}
