use crate::{
    errors::TransportError,
    jail::JailTable,
    transport::{PendingRequest, Transport},
    types::{JsonRpcResponse, RequestType, RpcPayload},
};
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::Instant;

/// Callback notified with the endpoint of every outbound attempt.
pub type EndpointHook = Arc<dyn Fn(&str) + Send + Sync>;

static NEXT_ROUTER_ID: AtomicU64 = AtomicU64::new(1);

/// The capability surface a strategy is given on every call.
///
/// # Context Pattern Design
///
/// Strategies never hold a reference to the router that owns them. The router passes
/// this context into each [`Strategy::send`](crate::strategy::Strategy::send) instead,
/// so there is no ownership cycle and a strategy can only reach the jail table and the
/// transport through the operations below.
///
/// - **Jail queries**: [`is_jailed`](Self::is_jailed), [`jail_until`](Self::jail_until),
///   [`only_free_endpoints`](Self::only_free_endpoints), always evaluated against now.
/// - **Jailing**: [`jail`](Self::jail) applies the configured policy.
/// - **Attempts**: [`send_request`](Self::send_request) performs one attempt;
///   [`create_request`](Self::create_request) prepares a cancellable one for fan-out.
pub struct RoutingContext {
    id: u64,
    transport: Arc<dyn Transport>,
    jail: JailTable,
    request_timeout: Duration,
    write_methods: Vec<String>,
    on_endpoint_used: Option<EndpointHook>,
}

impl RoutingContext {
    /// Creates a context with a fresh router identity.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        jail: JailTable,
        request_timeout: Duration,
        write_methods: Vec<String>,
        on_endpoint_used: Option<EndpointHook>,
    ) -> Self {
        Self {
            id: NEXT_ROUTER_ID.fetch_add(1, Ordering::Relaxed),
            transport,
            jail,
            request_timeout,
            write_methods,
            on_endpoint_used,
        }
    }

    /// Identity of the owning router, used for strategy binding.
    #[must_use]
    pub fn router_id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn is_jailed(&self, endpoint: &str) -> bool {
        self.jail.is_jailed(endpoint)
    }

    /// Returns the recorded jail expiry of `endpoint`, which may already have passed.
    #[must_use]
    pub fn jail_until(&self, endpoint: &str) -> Option<Instant> {
        self.jail.jailed_until(endpoint)
    }

    /// Returns the endpoints of `pool` that are currently free, in pool order.
    #[must_use]
    pub fn only_free_endpoints<'a>(&self, pool: &'a [String]) -> Vec<&'a str> {
        self.jail.free(pool)
    }

    /// Jails `endpoint` according to the configured policy.
    pub fn jail(&self, endpoint: &str, error: &TransportError) {
        if let Some(duration) = self.jail.jail(endpoint, error) {
            tracing::warn!(
                endpoint = endpoint,
                error = %error,
                jail_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                "endpoint jailed"
            );
        }
    }

    /// Classifies a payload: `Write` if any call uses a write method, `Read` otherwise.
    #[must_use]
    pub fn request_type(&self, payload: &RpcPayload) -> RequestType {
        if payload.has_method_in(&self.write_methods) {
            RequestType::Write
        } else {
            RequestType::Read
        }
    }

    /// Prepares one attempt and notifies the endpoint hook.
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
        let body = payload.to_body().map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let timeout = timeout.unwrap_or(self.request_timeout);

        tracing::trace!(
            endpoint = endpoint,
            calls = payload.calls().len(),
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            "outbound request created"
        );

        if let Some(hook) = &self.on_endpoint_used {
            hook(endpoint);
        }

        Ok(PendingRequest::new(Arc::clone(&self.transport), endpoint, body, timeout))
    }

    /// Performs exactly one attempt against `endpoint`.
    ///
    /// Failures are returned untouched; jailing is the caller's decision.
    ///
    /// # Errors
    ///
    /// Returns the [`TransportError`] of the attempt.
    pub async fn send_request(
        &self,
        payload: &RpcPayload,
        endpoint: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<JsonRpcResponse>, TransportError> {
        self.create_request(payload, endpoint, timeout)?.send().await
    }

    /// Suspends until the earliest expiry in `pool` if every endpoint in it is jailed.
    ///
    /// Returns immediately when at least one endpoint is free.
    pub async fn wait_if_all_jailed(&self, pool: &[String]) {
        if let Some(release) = self.jail.earliest_release(pool) {
            let wait = release.saturating_duration_since(Instant::now());
            tracing::debug!(
                pool_size = pool.len(),
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                "all endpoints jailed, waiting for earliest release"
            );
            tokio::time::sleep_until(release).await;
        }
    }

    /// Returns every currently jailed endpoint with its expiry.
    #[must_use]
    pub fn jailed_endpoints(&self) -> Vec<(String, Instant)> {
        self.jail.jailed()
    }
}

impl fmt::Debug for RoutingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingContext")
            .field("id", &self.id)
            .field("request_timeout", &self.request_timeout)
            .field("write_methods", &self.write_methods)
            .field("jail", &self.jail)
            .finish_non_exhaustive()
    }
}
