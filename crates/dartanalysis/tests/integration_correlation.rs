//! Integration tests for request/response correlation
//!
//! Drives the full client through a real stdio transport against an
//! in-memory server.

mod common;

use common::{connect, diagnostic, id_of, round_trip, within};
use dartanalysis::AnalysisError;
use dartanalysis::protocol::AnalysisSubscription;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn test_responses_in_reverse_order_reach_their_callers() {
    let (service, mut server) = connect();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let s = Arc::clone(&service);
        tasks.push(tokio::spawn(async move {
            s.get_errors(format!("/proj/f{}.dart", i)).await
        }));
    }

    let mut requests = Vec::new();
    for _ in 0..8 {
        requests.push(within(server.expect_request()).await.unwrap());
    }

    for request in requests.iter().rev() {
        let file = request["params"]["file"].as_str().unwrap();
        server
            .respond(&id_of(request), json!({ "errors": [diagnostic(file)] }))
            .await
            .unwrap();
    }

    for (i, task) in tasks.into_iter().enumerate() {
        let errors = within(task).await.unwrap().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location.file, format!("/proj/f{}.dart", i));
    }
    assert_eq!(service.pending_requests(), 0);
}

#[tokio::test]
async fn test_concurrent_sends_get_unique_ids() {
    let (service, mut server) = connect();

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let s = Arc::clone(&service);
        tasks.push(tokio::spawn(async move { s.get_version().await }));
    }

    let mut ids = HashSet::new();
    for _ in 0..20 {
        let request = within(server.expect_request()).await.unwrap();
        assert!(ids.insert(id_of(&request)), "duplicate id in {}", request);
    }
    assert_eq!(service.pending_requests(), 20);

    for id in &ids {
        server.respond(id, json!({ "version": id })).await.unwrap();
    }
    for task in tasks {
        within(task).await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_error_response_fails_only_its_caller() {
    let (service, mut server) = connect();

    let mut tasks = Vec::new();
    for _ in 0..3 {
        let s = Arc::clone(&service);
        tasks.push(tokio::spawn(async move { s.get_version().await }));
    }

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(id_of(&within(server.expect_request()).await.unwrap()));
    }
    ids.sort_by_key(|id| id.parse::<u64>().unwrap());

    server.respond_error(&ids[1], 3, "SERVER_ERROR").await.unwrap();
    server.respond(&ids[0], json!({ "version": "a" })).await.unwrap();
    server.respond(&ids[2], json!({ "version": "c" })).await.unwrap();

    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(within(task).await.unwrap());
    }

    let failures: Vec<_> = outcomes.iter().filter(|r| r.is_err()).collect();
    assert_eq!(failures.len(), 1);
    match failures[0] {
        Err(AnalysisError::Server { code, message }) => {
            assert_eq!(*code, 3);
            assert_eq!(message, "SERVER_ERROR");
        }
        other => panic!("Expected server error, got {:?}", other),
    }

    let mut versions: Vec<_> = outcomes.into_iter().filter_map(|r| r.ok()).collect();
    versions.sort();
    assert_eq!(versions, vec!["a", "c"]);
}

#[tokio::test]
async fn test_set_subscriptions_success() {
    let (service, mut server) = connect();

    let s = Arc::clone(&service);
    let task = tokio::spawn(async move {
        s.set_subscriptions(&[AnalysisSubscription::Highlights], &["/proj"])
            .await
    });

    let request = within(server.expect_request()).await.unwrap();
    assert_eq!(
        request,
        json!({
            "id": "1",
            "method": "analysis.setSubscriptions",
            "params": { "subscriptions": { "HIGHLIGHTS": ["/proj"] } }
        })
    );

    server.send_raw(r#"{"id":"1","result":{}}"#).await.unwrap();
    within(task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_set_subscriptions_server_error() {
    let (service, mut server) = connect();

    let s = Arc::clone(&service);
    let task = tokio::spawn(async move {
        s.set_subscriptions(&[AnalysisSubscription::Highlights], &["/proj"])
            .await
    });

    within(server.expect_request()).await.unwrap();
    server
        .send_raw(r#"{"id":"1","error":{"code":1,"message":"UNKNOWN_REQUEST"}}"#)
        .await
        .unwrap();

    let err = within(task).await.unwrap().unwrap_err();
    assert_eq!(err.server_code(), Some(1));
    assert!(err.to_string().contains("UNKNOWN_REQUEST"));
}

#[tokio::test]
async fn test_absent_result_completes_empty_command() {
    let (service, mut server) = connect();

    let s = Arc::clone(&service);
    let task = tokio::spawn(async move { s.set_priority_files(["/proj/a.dart"]).await });

    let request = within(server.expect_request()).await.unwrap();
    server
        .send_raw(&json!({ "id": id_of(&request) }).to_string())
        .await
        .unwrap();

    within(task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_garbage_and_stale_responses_are_dropped() {
    let (service, mut server) = connect();

    server.send_raw("this is not json").await.unwrap();
    server.send_raw(r#"{"neither":"shape"}"#).await.unwrap();
    server.send_raw(r#"{"id":"999","result":{}}"#).await.unwrap();
    server.send_raw("").await.unwrap();

    round_trip(&service, &mut server).await;
    assert_eq!(service.pending_requests(), 0);
}

#[tokio::test]
async fn test_result_with_wrong_shape_is_a_decode_error() {
    let (service, mut server) = connect();

    let s = Arc::clone(&service);
    let task = tokio::spawn(async move { s.get_version().await });

    let request = within(server.expect_request()).await.unwrap();
    server
        .respond(&id_of(&request), json!({ "version": 12 }))
        .await
        .unwrap();

    assert!(matches!(
        within(task).await.unwrap(),
        Err(AnalysisError::Decode(_))
    ));

    // The connection is still usable.
    round_trip(&service, &mut server).await;
}
