use super::{send_in_turn, Attempts, RouterBinding, Strategy};
use crate::{
    errors::{ConfigError, RouterError},
    router::RoutingContext,
    types::{JsonRpcResponse, RequestType, RpcPayload},
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

/// Default number of attempts routed to one endpoint before moving to the next.
pub const DEFAULT_REQUESTS_PER_ENDPOINT: usize = 5;

/// Position of the round-robin for one request class.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    index: usize,
    served: usize,
}

impl Cursor {
    fn advance(&mut self, len: usize) {
        self.index = (self.index + 1) % len;
        self.served = 0;
    }
}

/// Round-robin that stays on each endpoint for a fixed number of requests.
///
/// The cursor survives across calls, one per request class. A jailed or already tried
/// endpoint under the cursor is skipped by advancing, which also restarts the quota.
#[derive(Debug)]
pub struct SequentialStrategy {
    binding: RouterBinding,
    requests_per_endpoint: usize,
    cursors: Mutex<HashMap<RequestType, Cursor>>,
}

impl SequentialStrategy {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidStrategyOption`] if `requests_per_endpoint` is zero.
    pub fn new(requests_per_endpoint: usize) -> Result<Self, ConfigError> {
        if requests_per_endpoint == 0 {
            return Err(ConfigError::InvalidStrategyOption {
                strategy: "sequential",
                reason: "requests_per_endpoint must be at least 1".to_string(),
            });
        }
        Ok(Self {
            binding: RouterBinding::default(),
            requests_per_endpoint,
            cursors: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn requests_per_endpoint(&self) -> usize {
        self.requests_per_endpoint
    }

    fn next_endpoint(
        &self,
        ctx: &RoutingContext,
        class: RequestType,
        pool: &[String],
        attempts: &Attempts,
    ) -> Option<String> {
        if pool.is_empty() {
            return None;
        }

        let mut cursors = self.cursors.lock();
        let cursor = cursors.entry(class).or_default();
        if cursor.served >= self.requests_per_endpoint {
            cursor.advance(pool.len());
        }

        for _ in 0..pool.len() {
            let endpoint = &pool[cursor.index % pool.len()];
            if ctx.is_jailed(endpoint) || attempts.is_tried(endpoint) {
                cursor.advance(pool.len());
                continue;
            }
            cursor.served += 1;
            return Some(endpoint.clone());
        }

        None
    }
}

impl Default for SequentialStrategy {
    fn default() -> Self {
        Self {
            binding: RouterBinding::default(),
            requests_per_endpoint: DEFAULT_REQUESTS_PER_ENDPOINT,
            cursors: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Strategy for SequentialStrategy {
    fn name(&self) -> &'static str {
        "sequential"
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
        let class = ctx.request_type(payload);
        send_in_turn(ctx, payload, self.name(), |attempts| {
            self.next_endpoint(ctx, class, pool, attempts)
        })
        .await
        .map(|delivered| delivered.responses)
    }
}
