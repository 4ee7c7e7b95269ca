use super::{candidates, send_in_turn, RouterBinding, Strategy};
use crate::{
    errors::{ConfigError, RouterError},
    latency::{LatencyWindow, DEFAULT_HISTORY_DEPTH, MAX_HISTORY_DEPTH},
    router::RoutingContext,
    types::{JsonRpcResponse, RpcPayload},
};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

/// Prefers the endpoint with the lowest mean latency over its recent successes.
///
/// Endpoints with no recorded latency have a mean of zero and therefore win over every
/// measured endpoint until they have been tried once. Ties keep pool order.
#[derive(Debug)]
pub struct DynamicStrategy {
    binding: RouterBinding,
    latencies: LatencyWindow,
}

impl DynamicStrategy {
    /// Creates a strategy keeping `history_depth` samples per endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidStrategyOption`] if `history_depth` is zero or above
    /// [`MAX_HISTORY_DEPTH`].
    pub fn new(history_depth: usize) -> Result<Self, ConfigError> {
        if !(1..=MAX_HISTORY_DEPTH).contains(&history_depth) {
            return Err(ConfigError::InvalidStrategyOption {
                strategy: "dynamic",
                reason: format!("history_depth must be between 1 and {MAX_HISTORY_DEPTH}"),
            });
        }
        Ok(Self { binding: RouterBinding::default(), latencies: LatencyWindow::new(history_depth) })
    }

    /// Mean of the recorded latencies for `endpoint`, zero if none.
    #[must_use]
    pub fn mean_latency(&self, endpoint: &str) -> Duration {
        self.latencies.mean(endpoint)
    }

    /// Adds a latency sample for `endpoint` as if a request had just succeeded.
    pub fn record_latency(&self, endpoint: &str, latency: Duration) {
        self.latencies.record(endpoint, latency);
    }

    fn fastest<'a>(&self, free: impl Iterator<Item = &'a String>) -> Option<String> {
        let mut best: Option<(&String, Duration)> = None;
        for endpoint in free {
            let mean = self.latencies.mean(endpoint);
            if best.map_or(true, |(_, lowest)| mean < lowest) {
                best = Some((endpoint, mean));
            }
        }
        best.map(|(endpoint, _)| endpoint.clone())
    }
}

impl Default for DynamicStrategy {
    fn default() -> Self {
        Self {
            binding: RouterBinding::default(),
            latencies: LatencyWindow::new(DEFAULT_HISTORY_DEPTH),
        }
    }
}

#[async_trait]
impl Strategy for DynamicStrategy {
    fn name(&self) -> &'static str {
        "dynamic"
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
        let delivered = send_in_turn(ctx, payload, self.name(), |attempts| {
            self.fastest(candidates(ctx, pool, attempts))
        })
        .await?;

        self.latencies.record(&delivered.endpoint, delivered.latency);
        Ok(delivered.responses)
    }
}
