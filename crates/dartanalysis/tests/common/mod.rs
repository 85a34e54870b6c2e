//! Shared helpers for integration tests

#![allow(dead_code)]

use dartanalysis::AnalysisService;
use dartanalysis::testing::{FakeServer, fake_service};
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Install a test log subscriber; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fail the test instead of hanging
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

/// A running service wired to an in-memory server
pub fn connect() -> (Arc<AnalysisService>, FakeServer) {
    init_tracing();
    let (service, server) = fake_service().expect("service should start");
    (Arc::new(service), server)
}

/// Id of a request read by the fake server
pub fn id_of(request: &Value) -> String {
    request["id"].as_str().expect("request id").to_string()
}

/// A single diagnostic against `file`
pub fn diagnostic(file: &str) -> Value {
    json!({
        "severity": "WARNING",
        "type": "STATIC_WARNING",
        "location": { "file": file, "offset": 0, "length": 1, "startLine": 1, "startColumn": 1 },
        "message": format!("problem in {}", file)
    })
}

/// `analysis.highlights` params for `file`
pub fn highlights(file: &str) -> Value {
    json!({
        "file": file,
        "regions": [{ "type": "KEYWORD", "offset": 0, "length": 6 }]
    })
}

/// Complete one `server.getVersion` round trip
///
/// Everything the server wrote before the response has been dispatched
/// once this returns, because the read loop handles lines in order.
pub async fn round_trip(service: &Arc<AnalysisService>, server: &mut FakeServer) {
    let s = Arc::clone(service);
    let task = tokio::spawn(async move { s.get_version().await });

    let request = within(server.expect_request()).await.unwrap();
    server.respond(&id_of(&request), json!({ "version": "1.0.0" })).await.unwrap();

    assert_eq!(within(task).await.unwrap().unwrap(), "1.0.0");
}
