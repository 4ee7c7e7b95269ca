//! Failover and jailing over HTTP.

use crate::mock_infrastructure::{unreachable_endpoint, RpcMockBuilder};
use rotor_core::{
    jail::JailPolicy,
    router::{EndpointPool, Router},
    strategy::FallbackStrategy,
    types::{JsonRpcRequest, RpcPayload},
    RouterError, TransportError,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

fn request(method: &str) -> RpcPayload {
    RpcPayload::from(JsonRpcRequest::new(method, None, json!(1)))
}

fn fallback_router(endpoints: Vec<String>) -> Router {
    Router::builder()
        .pool(EndpointPool::shared(endpoints))
        .strategy(Arc::new(FallbackStrategy::new()))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_server_error_fails_over_and_jails() {
    let mut primary = RpcMockBuilder::new().await;
    primary.mock_status("eth_chainId", 502, 1);
    let mut backup = RpcMockBuilder::new().await;
    backup.mock_method_times("eth_chainId", &json!("0x1"), 2);

    let router = fallback_router(vec![primary.url(), backup.url()]);

    router.send(&request("eth_chainId")).await.unwrap();
    assert!(router.is_jailed(&primary.url()));

    // Jailed primary is skipped without another attempt.
    router.send(&request("eth_chainId")).await.unwrap();

    assert!(primary.verify_all_called().await);
    assert!(backup.verify_all_called().await);
}

#[tokio::test]
async fn test_rate_limited_endpoint_jailed_longer() {
    let mut limited = RpcMockBuilder::new().await;
    limited.mock_status("eth_chainId", 429, 1);
    let mut backup = RpcMockBuilder::new().await;
    backup.mock_method("eth_chainId", &json!("0x1"));

    let router = Router::builder()
        .pool(EndpointPool::shared([limited.url(), backup.url()]))
        .strategy(Arc::new(FallbackStrategy::new()))
        .jail_policy(JailPolicy::rate_limit_aware(Duration::from_secs(1), Duration::from_secs(60)))
        .build()
        .unwrap();

    router.send(&request("eth_chainId")).await.unwrap();

    let until = router.jail_until(&limited.url()).unwrap();
    assert!(until.saturating_duration_since(Instant::now()) > Duration::from_secs(30));
}

#[tokio::test]
async fn test_unparseable_body_fails_over() {
    let mut garbled = RpcMockBuilder::new().await;
    garbled.mock_invalid_json("eth_chainId");
    let mut backup = RpcMockBuilder::new().await;
    backup.mock_method("eth_chainId", &json!("0x1"));

    let router = fallback_router(vec![garbled.url(), backup.url()]);

    let responses = router.send(&request("eth_chainId")).await.unwrap();

    assert_eq!(responses[0].result, Some(json!("0x1")));
    assert!(router.is_jailed(&garbled.url()));
}

#[tokio::test]
async fn test_rpc_error_object_is_not_failover() {
    let mut reverting = RpcMockBuilder::new().await;
    reverting.mock_rpc_error("eth_call", -32000, "execution reverted");
    let mut backup = RpcMockBuilder::new().await;
    backup.mock_method_times("eth_call", &json!("0x"), 0);

    let router = fallback_router(vec![reverting.url(), backup.url()]);

    let responses = router.send(&request("eth_call")).await.unwrap();
    let error = responses[0].error.as_ref().unwrap();

    assert_eq!(error.code, -32000);
    assert_eq!(error.message, "execution reverted");
    assert!(!router.is_jailed(&reverting.url()));
    assert!(backup.verify_all_called().await);
}

#[tokio::test]
async fn test_all_attempts_reported_in_order() {
    let dead = unreachable_endpoint();
    let mut broken = RpcMockBuilder::new().await;
    broken.mock_server_error();

    let router = fallback_router(vec![dead.clone(), broken.url()]);

    let error = router.send(&request("eth_chainId")).await.unwrap_err();
    let attempts = error.attempts();

    assert!(matches!(error, RouterError::AllAttemptsFailed(_)));
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].endpoint, dead);
    assert!(matches!(attempts[0].error, TransportError::ConnectionFailed(_)));
    assert_eq!(attempts[1].endpoint, broken.url());
    assert!(matches!(attempts[1].error, TransportError::HttpError(500, _)));
}

#[tokio::test]
async fn test_batch_answered_in_order() {
    let mut upstream = RpcMockBuilder::new().await;
    upstream.mock_batch(&[json!("0x1"), json!("0x10")]);

    let router = fallback_router(vec![upstream.url()]);

    let batch = RpcPayload::from(vec![
        JsonRpcRequest::new("eth_chainId", None, json!(1)),
        JsonRpcRequest::new("eth_gasPrice", None, json!(2)),
    ]);
    let responses = router.send(&batch).await.unwrap();

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].id, json!(1));
    assert_eq!(responses[0].result, Some(json!("0x1")));
    assert_eq!(responses[1].id, json!(2));
    assert_eq!(responses[1].result, Some(json!("0x10")));
}
