//! Endpoint selection strategies.
//!
//! Every strategy implements [`Strategy::send`]: given a payload and the ordered pool
//! for its request class, decide which endpoints to try and how. Four of them
//! ([`FallbackStrategy`], [`SequentialStrategy`], [`RandomStrategy`],
//! [`DynamicStrategy`]) and the ranking path of [`HighestBlockStrategy`] share one
//! control loop: pick a free endpoint not yet tried in this call,
//! attempt it, and on failure jail it and pick again until the pool is exhausted.
//! [`FastestStrategy`] races every free endpoint at once instead.

mod dynamic;
mod fallback;
mod fastest;
mod highest_block;
mod random;
mod sequential;

pub use dynamic::DynamicStrategy;
pub use fallback::FallbackStrategy;
pub use fastest::FastestStrategy;
pub use highest_block::{HighestBlockStrategy, DEFAULT_SYNC_INTERVAL, SYNC_REQUEST_TIMEOUT};
pub use random::RandomStrategy;
pub use sequential::{SequentialStrategy, DEFAULT_REQUESTS_PER_ENDPOINT};

use crate::{
    errors::{AttemptError, ConfigError, RouterError, TransportError},
    router::RoutingContext,
    types::{JsonRpcResponse, RpcPayload},
};
use async_trait::async_trait;
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::Instant;

/// A pluggable endpoint selection policy.
///
/// A strategy instance belongs to exactly one router. It may serve both request classes
/// of that router, but handing it to a second router fails at build time with
/// [`ConfigError::StrategyAlreadyBound`].
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Ownership record consulted by [`Strategy::bind`].
    fn binding(&self) -> &RouterBinding;

    /// Claims this strategy for the router identified by `router_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StrategyAlreadyBound`] if another router claimed it first.
    fn bind(&self, router_id: u64) -> Result<(), ConfigError> {
        self.binding().bind(router_id, self.name())
    }

    /// Releases a claim made by `router_id`. No-op if another router owns the strategy.
    fn unbind(&self, router_id: u64) {
        self.binding().release(router_id);
    }

    /// Delivers `payload` to one or more endpoints of `pool`.
    ///
    /// # Errors
    ///
    /// - [`RouterError::NoEndpointAvailable`] if no attempt could be made
    /// - [`RouterError::AllAttemptsFailed`] with one entry per failed attempt otherwise
    async fn send(
        &self,
        ctx: &Arc<RoutingContext>,
        payload: &RpcPayload,
        pool: &[String],
    ) -> Result<Vec<JsonRpcResponse>, RouterError>;

    /// Stops background work owned by the strategy. Idempotent.
    fn stop(&self) {}
}

/// Records which router, if any, a strategy instance belongs to.
#[derive(Debug, Default)]
pub struct RouterBinding {
    router_id: AtomicU64,
}

impl RouterBinding {
    /// Binds to `router_id`. Rebinding to the same router is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StrategyAlreadyBound`] if bound to a different router.
    pub fn bind(&self, router_id: u64, strategy: &'static str) -> Result<(), ConfigError> {
        match self.router_id.compare_exchange(0, router_id, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(current) if current == router_id => Ok(()),
            Err(_) => Err(ConfigError::StrategyAlreadyBound { strategy }),
        }
    }

    /// Clears the binding if it is held by `router_id`.
    pub fn release(&self, router_id: u64) {
        let _ = self.router_id.compare_exchange(router_id, 0, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Returns the owning router's id once bound.
    #[must_use]
    pub fn router_id(&self) -> Option<u64> {
        match self.router_id.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }
}

/// Per-call bookkeeping of tried endpoints and their failures.
#[derive(Debug, Default)]
pub(crate) struct Attempts {
    errors: Vec<AttemptError>,
    tried: HashSet<String>,
}

impl Attempts {
    pub(crate) fn is_tried(&self, endpoint: &str) -> bool {
        self.tried.contains(endpoint)
    }

    /// Marks `endpoint` as tried. Returns `false` if it already was.
    fn claim(&mut self, endpoint: &str) -> bool {
        self.tried.insert(endpoint.to_string())
    }

    /// Records a failed attempt, jailing the endpoint when the failure is its fault.
    pub(crate) fn fail(&mut self, ctx: &RoutingContext, endpoint: &str, error: TransportError) {
        if error.penalizes_endpoint() {
            ctx.jail(endpoint, &error);
        }
        self.tried.insert(endpoint.to_string());
        self.errors.push(AttemptError { endpoint: endpoint.to_string(), error });
    }

    /// Terminal error once no candidate remains.
    pub(crate) fn exhausted(self) -> RouterError {
        if self.errors.is_empty() {
            RouterError::NoEndpointAvailable
        } else {
            RouterError::AllAttemptsFailed(self.errors)
        }
    }
}

/// A successful attempt made by [`send_in_turn`].
#[derive(Debug)]
pub(crate) struct Delivered {
    pub endpoint: String,
    pub latency: Duration,
    pub responses: Vec<JsonRpcResponse>,
}

/// Endpoints of `pool` that are free and not yet tried in this call, in pool order.
pub(crate) fn candidates<'a>(
    ctx: &'a RoutingContext,
    pool: &'a [String],
    attempts: &'a Attempts,
) -> impl Iterator<Item = &'a String> + 'a {
    pool.iter().filter(move |endpoint| !attempts.is_tried(endpoint) && !ctx.is_jailed(endpoint))
}

/// Free endpoints of `pool` with duplicates removed, in pool order.
pub(crate) fn distinct_free<'a>(ctx: &RoutingContext, pool: &'a [String]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    ctx.only_free_endpoints(pool).into_iter().filter(|endpoint| seen.insert(*endpoint)).collect()
}

/// Tries one endpoint at a time, as chosen by `pick`, until one succeeds.
///
/// `pick` sees the attempts made so far and must only return endpoints that are free and
/// untried; an endpoint it returns twice ends the call as if nothing were left.
pub(crate) async fn send_in_turn<F>(
    ctx: &RoutingContext,
    payload: &RpcPayload,
    strategy: &'static str,
    mut pick: F,
) -> Result<Delivered, RouterError>
where
    F: FnMut(&Attempts) -> Option<String> + Send,
{
    let mut attempts = Attempts::default();

    loop {
        let Some(endpoint) = pick(&attempts) else {
            tracing::debug!(strategy = strategy, "no untried endpoint left");
            return Err(attempts.exhausted());
        };
        if !attempts.claim(&endpoint) {
            return Err(attempts.exhausted());
        }

        tracing::debug!(strategy = strategy, endpoint = %endpoint, "endpoint selected");

        let started = Instant::now();
        match ctx.send_request(payload, &endpoint, None).await {
            Ok(responses) => {
                return Ok(Delivered { latency: started.elapsed(), endpoint, responses });
            }
            Err(error) => {
                tracing::warn!(
                    strategy = strategy,
                    endpoint = %endpoint,
                    error = %error,
                    "attempt failed, trying next endpoint"
                );
                attempts.fail(ctx, &endpoint, error);
            }
        }
    }
}
