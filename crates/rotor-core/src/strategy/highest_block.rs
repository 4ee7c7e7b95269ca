//! Block-height ranked selection with background height polling.
//!
//! The first `send` (or an explicit [`HighestBlockStrategy::start`]) launches a sync
//! round immediately and a ticker that launches another every `sync_interval`. Each
//! round asks every free tracked endpoint for `eth_blockNumber` concurrently and records
//! the heights it gets back. A `send` waits for the most recently started round to
//! finish before ranking, so it never ranks on heights older than that round.

use super::{candidates, distinct_free, send_in_turn, RouterBinding, Strategy};
use crate::{
    errors::{ConfigError, RouterError, TransportError},
    router::RoutingContext,
    types::{JsonRpcRequest, JsonRpcResponse, RpcPayload, BLOCK_NUMBER_METHOD},
};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::json;
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::watch,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default time between sync rounds.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// Per-endpoint timeout of a height poll.
pub const SYNC_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
enum SyncState {
    Idle,
    Running(CancellationToken),
    Stopped,
}

/// State shared between the strategy, its ticker and in-flight rounds.
#[derive(Debug)]
struct SyncShared {
    tracked: Mutex<Vec<String>>,
    heights: DashMap<String, u64>,
    rounds_started: AtomicU64,
    rounds_completed: watch::Sender<u64>,
}

impl SyncShared {
    fn new() -> Self {
        Self {
            tracked: Mutex::new(Vec::new()),
            heights: DashMap::new(),
            rounds_started: AtomicU64::new(0),
            rounds_completed: watch::Sender::new(0),
        }
    }

    /// Adds endpoints of `pool` not yet polled by sync rounds.
    fn track(&self, pool: &[String]) {
        let mut tracked = self.tracked.lock();
        for endpoint in pool {
            if !tracked.contains(endpoint) {
                tracked.push(endpoint.clone());
            }
        }
    }

    fn spawn_round(self: &Arc<Self>, ctx: &Arc<RoutingContext>) {
        let round = self.rounds_started.fetch_add(1, Ordering::AcqRel) + 1;
        let shared = Arc::clone(self);
        let ctx = Arc::clone(ctx);

        tokio::spawn(async move {
            shared.sync_round(&ctx).await;
            shared.rounds_completed.send_modify(|done| *done = (*done).max(round));
            debug!(round = round, "block height sync round finished");
        });
    }

    async fn sync_round(&self, ctx: &RoutingContext) {
        let tracked = self.tracked.lock().clone();
        let free = distinct_free(ctx, &tracked);

        let polls = free.into_iter().map(|endpoint| async move {
            let result = poll_height(ctx, endpoint).await;
            (endpoint, result)
        });

        for (endpoint, result) in join_all(polls).await {
            match result {
                Ok(height) => {
                    self.heights.insert(endpoint.to_string(), height);
                }
                Err(error) if error.is_timeout() || error.is_cancelled() => {
                    debug!(endpoint = endpoint, error = %error, "block height poll abandoned");
                }
                Err(error) => {
                    warn!(endpoint = endpoint, error = %error, "block height poll failed");
                    ctx.jail(endpoint, &error);
                }
            }
        }
    }

    /// Waits until the most recently started round has completed.
    async fn wait_for_latest_round(&self) {
        let target = self.rounds_started.load(Ordering::Acquire);
        if target == 0 {
            return;
        }

        let mut completed = self.rounds_completed.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = completed.wait_for(|done| *done >= target).await;
    }
}

async fn poll_height(ctx: &RoutingContext, endpoint: &str) -> Result<u64, TransportError> {
    let payload =
        RpcPayload::from(JsonRpcRequest::new(BLOCK_NUMBER_METHOD, Some(json!([])), json!(1)));
    let responses = ctx.send_request(&payload, endpoint, Some(SYNC_REQUEST_TIMEOUT)).await?;

    let response = responses
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::InvalidResponse("empty response batch".to_string()))?;
    if let Some(error) = response.error {
        return Err(TransportError::InvalidResponse(format!(
            "rpc error {}: {}",
            error.code, error.message
        )));
    }

    let hex = response
        .result
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| TransportError::InvalidResponse("block number is not a string".into()))?;
    u64::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| TransportError::InvalidResponse(format!("invalid block number {hex}: {e}")))
}

/// Prefers the free endpoint reporting the highest block.
///
/// Endpoints never polled successfully count as height 0. Ties keep pool order.
/// Dropping the strategy stops its ticker.
#[derive(Debug)]
pub struct HighestBlockStrategy {
    binding: RouterBinding,
    sync_interval: Duration,
    shared: Arc<SyncShared>,
    state: Mutex<SyncState>,
}

impl HighestBlockStrategy {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidStrategyOption`] if `sync_interval` is zero.
    pub fn new(sync_interval: Duration) -> Result<Self, ConfigError> {
        if sync_interval.is_zero() {
            return Err(ConfigError::InvalidStrategyOption {
                strategy: "highest_block",
                reason: "sync_interval must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            binding: RouterBinding::default(),
            sync_interval,
            shared: Arc::new(SyncShared::new()),
            state: Mutex::new(SyncState::Idle),
        })
    }

    #[must_use]
    pub fn sync_interval(&self) -> Duration {
        self.sync_interval
    }

    /// Last observed height of `endpoint`, 0 if unknown.
    #[must_use]
    pub fn block_height(&self, endpoint: &str) -> u64 {
        self.shared.heights.get(endpoint).map_or(0, |height| *height)
    }

    /// Returns `true` while the ticker is running.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        matches!(*self.state.lock(), SyncState::Running(_))
    }

    /// Starts background polling of `pool` if it is not running yet.
    ///
    /// Endpoints of `pool` are added to the polled set either way. Has no effect on the
    /// ticker once the strategy has been stopped. Must be called within a Tokio runtime.
    pub fn start(&self, ctx: &Arc<RoutingContext>, pool: &[String]) {
        self.shared.track(pool);

        let mut state = self.state.lock();
        if !matches!(*state, SyncState::Idle) {
            return;
        }

        self.shared.spawn_round(ctx);

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let shared = Arc::clone(&self.shared);
        let ctx = Arc::clone(ctx);
        let interval = self.sync_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => shared.spawn_round(&ctx),
                }
            }
            info!("block height sync stopped");
        });

        info!(
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            endpoints = pool.len(),
            "block height sync started"
        );
        *state = SyncState::Running(shutdown);
    }

    fn highest<'a>(&self, free: impl Iterator<Item = &'a String>) -> Option<String> {
        let mut best: Option<(&String, u64)> = None;
        for endpoint in free {
            let height = self.block_height(endpoint);
            if best.map_or(true, |(_, highest)| height > highest) {
                best = Some((endpoint, height));
            }
        }
        best.map(|(endpoint, _)| endpoint.clone())
    }
}

impl Default for HighestBlockStrategy {
    fn default() -> Self {
        Self {
            binding: RouterBinding::default(),
            sync_interval: DEFAULT_SYNC_INTERVAL,
            shared: Arc::new(SyncShared::new()),
            state: Mutex::new(SyncState::Idle),
        }
    }
}

impl Drop for HighestBlockStrategy {
    fn drop(&mut self) {
        if let SyncState::Running(token) = &*self.state.get_mut() {
            token.cancel();
        }
    }
}

#[async_trait]
impl Strategy for HighestBlockStrategy {
    fn name(&self) -> &'static str {
        "highest_block"
    }

    fn binding(&self) -> &RouterBinding {
        &self.binding
    }

    async fn send(
        &self,
        ctx: &Arc<RoutingContext>,
        payload: &RpcPayload,
        pool: &[String],
    ) -> Result<Vec<JsonRpcResponse>, RouterError> {
        self.start(ctx, pool);
        self.shared.wait_for_latest_round().await;

        send_in_turn(ctx, payload, self.name(), |attempts| {
            self.highest(candidates(ctx, pool, attempts))
        })
        .await
        .map(|delivered| delivered.responses)
    }

    /// Cancels the ticker. Rounds already in flight still finish.
    fn stop(&self) {
        let mut state = self.state.lock();
        if let SyncState::Running(token) = std::mem::replace(&mut *state, SyncState::Stopped) {
            token.cancel();
        }
    }
}
