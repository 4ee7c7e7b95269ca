//! Router dispatch over HTTP: classification, backpressure, hooks and config.

use crate::mock_infrastructure::{unreachable_endpoint, RpcMockBuilder};
use parking_lot::Mutex;
use rotor_core::{
    config::RouterConfig,
    router::{EndpointPool, Router},
    strategy::FallbackStrategy,
    types::{JsonRpcRequest, RequestType, RpcPayload},
    RouterError, TransportError,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::time::Instant;

fn request(method: &str) -> RpcPayload {
    RpcPayload::from(JsonRpcRequest::new(method, None, json!(1)))
}

#[tokio::test]
async fn test_reads_and_writes_use_their_pools() {
    let mut reader = RpcMockBuilder::new().await;
    reader.mock_method("eth_chainId", &json!("0x1"));
    let mut writer = RpcMockBuilder::new().await;
    writer.mock_method("eth_sendRawTransaction", &json!("0xfeed"));

    let router = Router::builder()
        .pool(EndpointPool::split([reader.url()], [writer.url()]))
        .strategy(Arc::new(FallbackStrategy::new()))
        .build()
        .unwrap();

    let write = RpcPayload::from(JsonRpcRequest::new(
        "eth_sendRawTransaction",
        Some(json!(["0x02f8"])),
        json!(2),
    ));
    assert_eq!(router.request_type(&write), RequestType::Write);

    let read_responses = router.send(&request("eth_chainId")).await.unwrap();
    let write_responses = router.send(&write).await.unwrap();

    assert_eq!(read_responses[0].result, Some(json!("0x1")));
    assert_eq!(write_responses[0].result, Some(json!("0xfeed")));
    assert!(reader.verify_all_called().await);
    assert!(writer.verify_all_called().await);
}

#[tokio::test]
async fn test_hook_sees_every_attempt_in_order() {
    let mut upstream = RpcMockBuilder::new().await;
    upstream.mock_method("eth_chainId", &json!("0x1"));
    let dead = unreachable_endpoint();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let router = Router::builder()
        .pool(EndpointPool::shared([dead.clone(), upstream.url()]))
        .strategy(Arc::new(FallbackStrategy::new()))
        .on_endpoint_used(move |endpoint| sink.lock().push(endpoint.to_string()))
        .build()
        .unwrap();

    router.send(&request("eth_chainId")).await.unwrap();

    assert_eq!(*seen.lock(), vec![dead.clone(), upstream.url()]);
    assert!(router.is_jailed(&dead));
}

#[tokio::test]
async fn test_backpressure_waits_for_jail_release() {
    let mut upstream = RpcMockBuilder::new().await;
    upstream.mock_method("eth_chainId", &json!("0x1"));

    let router = Router::builder()
        .pool(EndpointPool::shared([upstream.url()]))
        .strategy(Arc::new(FallbackStrategy::new()))
        .jail_duration(Duration::from_millis(300))
        .build()
        .unwrap();

    router.jail(&upstream.url(), &TransportError::Timeout);
    assert!(router.is_jailed(&upstream.url()));

    let start = Instant::now();
    let responses = router.send(&request("eth_chainId")).await.unwrap();

    assert!(start.elapsed() >= Duration::from_millis(250));
    assert_eq!(responses[0].result, Some(json!("0x1")));
    assert!(upstream.verify_all_called().await);
}

#[tokio::test]
async fn test_direct_request_ignores_and_skips_jail() {
    let mut upstream = RpcMockBuilder::new().await;
    upstream.mock_method("eth_chainId", &json!("0x1"));
    let dead = unreachable_endpoint();

    let router = Router::builder()
        .pool(EndpointPool::shared([upstream.url()]))
        .strategy(Arc::new(FallbackStrategy::new()))
        .build()
        .unwrap();

    router.jail(&upstream.url(), &TransportError::Timeout);
    let responses = router.send_request(&request("eth_chainId"), &upstream.url(), None).await;
    assert_eq!(responses.unwrap()[0].result, Some(json!("0x1")));

    let error = router.send_request(&request("eth_chainId"), &dead, None).await.unwrap_err();
    assert!(matches!(error, RouterError::Transport(TransportError::ConnectionFailed(_))));
    assert!(!router.is_jailed(&dead));
}

#[tokio::test]
async fn test_router_built_from_config() {
    let mut reader = RpcMockBuilder::new().await;
    reader.mock_method_times("eth_chainId", &json!("0x1"), 2);
    let mut writer = RpcMockBuilder::new().await;
    writer.mock_method("eth_sendRawTransaction", &json!("0xfeed"));

    let config: RouterConfig = toml::from_str(&format!(
        r#"
request_timeout_ms = 2000

[pool]
read = ["{reader}"]
write = ["{writer}"]

[strategy]
kind = "sequential"
requests_per_endpoint = 2

[write_strategy]
kind = "fastest"

[jail]
duration_ms = 500
"#,
        reader = reader.url(),
        writer = writer.url(),
    ))
    .unwrap();

    let router = config.build_router(None).unwrap();
    assert_eq!(router.strategy(RequestType::Read).name(), "sequential");
    assert_eq!(router.strategy(RequestType::Write).name(), "fastest");

    router.send(&request("eth_chainId")).await.unwrap();
    router.send(&request("eth_chainId")).await.unwrap();
    router.send(&request("eth_sendRawTransaction")).await.unwrap();

    assert!(reader.verify_all_called().await);
    assert!(writer.verify_all_called().await);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config: RouterConfig = toml::from_str(
        r#"
[pool]
endpoints = ["ftp://not-http.example"]
"#,
    )
    .unwrap();

    assert!(config.build_router(None).is_err());
}
