//! HTTP lookup client against a mock load balancer API.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use lb_operator::config::ApiConfig;
use lb_operator::lookup::{HttpLookup, LoadBalancerLookup, LookupError};

mod common;

fn lookup(addr: std::net::SocketAddr) -> HttpLookup {
    HttpLookup::new(&ApiConfig {
        endpoint: format!("http://{}", addr),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_snapshot_decoded() {
    let addr = common::start_programmable_api(|path| async move {
        assert_eq!(path, "/v1/loadbalancers/lb-abc");
        (
            200,
            r#"{"id":"lb-abc","name":"edge","location_id":"loc-east-1","resources":{"cpu":"2","memory":"4Gi"}}"#
                .to_string(),
        )
    })
    .await;

    let snapshot = lookup(addr).get(&"lb-abc".into()).await.unwrap();
    assert_eq!(snapshot.name, "edge");
    assert_eq!(snapshot.location_id.as_str(), "loc-east-1");
    assert_eq!(snapshot.resources.cpu, "2");
    assert_eq!(snapshot.resources.memory, "4Gi");
}

#[tokio::test]
async fn test_missing_id_filled_in() {
    let addr = common::start_programmable_api(|_| async { (200, r#"{"name":"edge"}"#.to_string()) }).await;

    let snapshot = lookup(addr).get(&"lb-abc".into()).await.unwrap();
    assert_eq!(snapshot.id.as_str(), "lb-abc");
}

#[tokio::test]
async fn test_not_found() {
    let addr = common::start_programmable_api(|_| async { (404, "{}".to_string()) }).await;

    let err = lookup(addr).get(&"lb-gone".into()).await.unwrap_err();
    assert!(matches!(err, LookupError::NotFound(id) if id.as_str() == "lb-gone"));
}

#[tokio::test]
async fn test_server_error_not_retried() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let addr = common::start_programmable_api(move |_| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (500, "{}".to_string())
        }
    })
    .await;

    let err = lookup(addr).get(&"lb-abc".into()).await.unwrap_err();
    assert!(matches!(err, LookupError::Status(500)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_garbage_body_is_decode_error() {
    let addr = common::start_programmable_api(|_| async { (200, "not json".to_string()) }).await;

    let err = lookup(addr).get(&"lb-abc".into()).await.unwrap_err();
    assert!(matches!(err, LookupError::Decode(_)));
}
