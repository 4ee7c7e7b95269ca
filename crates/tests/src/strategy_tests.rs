//! Selection strategies routed over real HTTP.

use crate::mock_infrastructure::{unreachable_endpoint, RpcMockBuilder};
use rotor_core::{
    router::{EndpointPool, Router},
    strategy::{
        DynamicStrategy, FastestStrategy, HighestBlockStrategy, RandomStrategy,
        SequentialStrategy, Strategy,
    },
    types::{JsonRpcRequest, RpcPayload},
    RouterError, TransportError,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};

fn request(method: &str) -> RpcPayload {
    RpcPayload::from(JsonRpcRequest::new(method, None, json!(1)))
}

fn router(endpoints: Vec<String>, strategy: Arc<dyn Strategy>) -> Router {
    Router::builder().pool(EndpointPool::shared(endpoints)).strategy(strategy).build().unwrap()
}

#[tokio::test]
async fn test_sequential_serves_quota_per_endpoint() {
    let mut first = RpcMockBuilder::new().await;
    first.mock_method_times("eth_chainId", &json!("0x1"), 2);
    let mut second = RpcMockBuilder::new().await;
    second.mock_method_times("eth_chainId", &json!("0x1"), 2);

    let router = router(
        vec![first.url(), second.url()],
        Arc::new(SequentialStrategy::new(2).unwrap()),
    );

    for _ in 0..4 {
        router.send(&request("eth_chainId")).await.unwrap();
    }

    assert!(first.verify_all_called().await);
    assert!(second.verify_all_called().await);
}

#[tokio::test]
async fn test_random_routes_around_dead_endpoint() {
    let mut upstream = RpcMockBuilder::new().await;
    upstream.mock_method_times("eth_chainId", &json!("0x1"), 5);

    let router =
        router(vec![unreachable_endpoint(), upstream.url()], Arc::new(RandomStrategy::new()));

    // The dead endpoint is tried at most once, then stays jailed.
    for _ in 0..5 {
        let responses = router.send(&request("eth_chainId")).await.unwrap();
        assert_eq!(responses[0].result, Some(json!("0x1")));
    }

    assert!(upstream.verify_all_called().await);
}

#[tokio::test]
async fn test_dynamic_rotates_through_unmeasured_endpoints() {
    let mut first = RpcMockBuilder::new().await;
    first.mock_method("eth_chainId", &json!("0x1"));
    let mut second = RpcMockBuilder::new().await;
    second.mock_method("eth_chainId", &json!("0x1"));

    let strategy = Arc::new(DynamicStrategy::default());
    let router = router(vec![first.url(), second.url()], strategy.clone());

    router.send(&request("eth_chainId")).await.unwrap();
    assert!(strategy.mean_latency(&first.url()) > Duration::ZERO);
    assert_eq!(strategy.mean_latency(&second.url()), Duration::ZERO);

    router.send(&request("eth_chainId")).await.unwrap();
    assert!(strategy.mean_latency(&second.url()) > Duration::ZERO);

    assert!(first.verify_all_called().await);
    assert!(second.verify_all_called().await);
}

#[tokio::test]
async fn test_highest_block_picks_most_synced_endpoint() {
    let mut behind = RpcMockBuilder::new().await;
    behind.mock_block_number(100);
    let mut ahead = RpcMockBuilder::new().await;
    ahead.mock_block_number(105).mock_method("eth_getBalance", &json!("0x64"));
    let mut middle = RpcMockBuilder::new().await;
    middle.mock_block_number(103);

    let strategy = Arc::new(HighestBlockStrategy::new(Duration::from_secs(60)).unwrap());
    let router = router(vec![behind.url(), ahead.url(), middle.url()], strategy.clone());

    let responses = router.send(&request("eth_getBalance")).await.unwrap();

    assert_eq!(responses[0].result, Some(json!("0x64")));
    assert_eq!(strategy.block_height(&behind.url()), 100);
    assert_eq!(strategy.block_height(&ahead.url()), 105);
    assert_eq!(strategy.block_height(&middle.url()), 103);
    assert!(strategy.is_syncing());
    assert!(ahead.verify_all_called().await);

    drop(router);
    assert!(!strategy.is_syncing());
}

#[tokio::test]
async fn test_fastest_returns_success_over_failure() {
    let mut broken = RpcMockBuilder::new().await;
    broken.mock_server_error();
    let mut healthy = RpcMockBuilder::new().await;
    healthy.mock_method("eth_chainId", &json!("0x1"));

    let router = router(vec![broken.url(), healthy.url()], Arc::new(FastestStrategy::new()));

    let responses = router.send(&request("eth_chainId")).await.unwrap();

    assert_eq!(responses[0].result, Some(json!("0x1")));
    assert!(!router.is_jailed(&healthy.url()));
    assert!(healthy.verify_all_called().await);
}

#[tokio::test]
async fn test_fastest_reports_every_failure() {
    let mut first = RpcMockBuilder::new().await;
    first.mock_status("eth_chainId", 502, 1);
    let mut second = RpcMockBuilder::new().await;
    second.mock_status("eth_chainId", 503, 1);

    let router = router(vec![first.url(), second.url()], Arc::new(FastestStrategy::new()));

    let error = router.send(&request("eth_chainId")).await.unwrap_err();

    let mut statuses: Vec<u16> = error
        .attempts()
        .iter()
        .filter_map(|attempt| match attempt.error {
            TransportError::HttpError(status, _) => Some(status),
            _ => None,
        })
        .collect();
    statuses.sort_unstable();

    assert!(matches!(error, RouterError::AllAttemptsFailed(_)));
    assert_eq!(statuses, vec![502, 503]);
    assert!(router.is_jailed(&first.url()));
    assert!(router.is_jailed(&second.url()));
}
