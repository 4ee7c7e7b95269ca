//! Request dispatch across endpoint pools.
//!
//! The [`Router`] classifies each payload as a read or a write, applies backpressure
//! when every endpoint of the matching pool is jailed, and hands the payload to the
//! strategy bound to that class. Strategies reach the jail table and the transport only
//! through the shared [`RoutingContext`].

mod builder;
mod context;

pub use builder::{EndpointPool, RouterBuilder, DEFAULT_REQUEST_TIMEOUT};
pub use context::{EndpointHook, RoutingContext};

use crate::{
    errors::{RouterError, TransportError},
    strategy::Strategy,
    transport::PendingRequest,
    types::{JsonRpcResponse, RequestType, RpcPayload},
};
use std::{fmt, sync::Arc, time::Duration};
use tokio::time::Instant;

/// Client-side JSON-RPC router over a pool of interchangeable endpoints.
///
/// The pool and jail policy are fixed at construction; jail entries and strategy state
/// live as long as the router. Dropping the router stops its strategies' background work.
pub struct Router {
    ctx: Arc<RoutingContext>,
    read_pool: Vec<String>,
    write_pool: Vec<String>,
    read_strategy: Arc<dyn Strategy>,
    write_strategy: Arc<dyn Strategy>,
}

impl Router {
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Sends one logical request through the strategy of its request class.
    ///
    /// If every endpoint of the class's pool is jailed, waits once until the earliest
    /// jail expiry before dispatching.
    ///
    /// # Errors
    ///
    /// - [`RouterError::NoEndpointAvailable`] if the strategy could not make any attempt
    /// - [`RouterError::AllAttemptsFailed`] if every attempted endpoint failed
    pub async fn send(&self, payload: &RpcPayload) -> Result<Vec<JsonRpcResponse>, RouterError> {
        let class = self.ctx.request_type(payload);
        let (pool, strategy) = self.route(class);

        self.ctx.wait_if_all_jailed(pool).await;

        tracing::debug!(
            request_type = class.as_str(),
            strategy = strategy.name(),
            calls = payload.calls().len(),
            "dispatching request"
        );

        strategy.send(&self.ctx, payload, pool).await
    }

    /// Performs exactly one attempt against `endpoint`, bypassing strategies and jails.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Transport`] with the attempt's failure. The endpoint is not
    /// jailed.
    pub async fn send_request(
        &self,
        payload: &RpcPayload,
        endpoint: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<JsonRpcResponse>, RouterError> {
        Ok(self.ctx.send_request(payload, endpoint, timeout).await?)
    }

    /// Prepares one cancellable attempt against `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if the payload cannot be serialized.
    pub fn create_request(
        &self,
        payload: &RpcPayload,
        endpoint: &str,
        timeout: Option<Duration>,
    ) -> Result<PendingRequest, TransportError> {
        self.ctx.create_request(payload, endpoint, timeout)
    }

    #[must_use]
    pub fn request_type(&self, payload: &RpcPayload) -> RequestType {
        self.ctx.request_type(payload)
    }

    #[must_use]
    pub fn is_jailed(&self, endpoint: &str) -> bool {
        self.ctx.is_jailed(endpoint)
    }

    #[must_use]
    pub fn jail_until(&self, endpoint: &str) -> Option<Instant> {
        self.ctx.jail_until(endpoint)
    }

    #[must_use]
    pub fn only_free_endpoints<'a>(&self, pool: &'a [String]) -> Vec<&'a str> {
        self.ctx.only_free_endpoints(pool)
    }

    /// Jails `endpoint` according to the router's policy.
    pub fn jail(&self, endpoint: &str, error: &TransportError) {
        self.ctx.jail(endpoint, error);
    }

    /// Every endpoint currently jailed, with its expiry.
    #[must_use]
    pub fn jailed_endpoints(&self) -> Vec<(String, Instant)> {
        self.ctx.jailed_endpoints()
    }

    #[must_use]
    pub fn pool(&self, class: RequestType) -> &[String] {
        self.route(class).0
    }

    #[must_use]
    pub fn strategy(&self, class: RequestType) -> &Arc<dyn Strategy> {
        self.route(class).1
    }

    #[must_use]
    pub fn context(&self) -> &Arc<RoutingContext> {
        &self.ctx
    }

    /// Stops background work of both strategies. Idempotent.
    pub fn shutdown(&self) {
        self.read_strategy.stop();
        self.write_strategy.stop();
    }

    fn route(&self, class: RequestType) -> (&[String], &Arc<dyn Strategy>) {
        match class {
            RequestType::Read => (self.read_pool.as_slice(), &self.read_strategy),
            RequestType::Write => (self.write_pool.as_slice(), &self.write_strategy),
        }
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("router_id", &self.ctx.router_id())
            .field("read_pool", &self.read_pool)
            .field("write_pool", &self.write_pool)
            .field("read_strategy", &self.read_strategy.name())
            .field("write_strategy", &self.write_strategy.name())
            .finish()
    }
}
