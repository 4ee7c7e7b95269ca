//! Builder pattern for constructing a [`Router`] with flexible configuration.

use super::{context::EndpointHook, Router, RoutingContext};
use crate::{
    errors::{ConfigError, TransportError},
    jail::{JailPolicy, JailTable},
    strategy::Strategy,
    transport::{HttpTransport, Transport},
    types::{RequestType, DEFAULT_WRITE_METHOD},
};
use std::{sync::Arc, time::Duration};

/// Default per-attempt timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Endpoints eligible for each request class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointPool {
    /// One list serving both reads and writes.
    Shared(Vec<String>),
    /// Separate lists per request class.
    Split { read: Vec<String>, write: Vec<String> },
}

impl EndpointPool {
    #[must_use]
    pub fn shared<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Shared(endpoints.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn split<R, W, S>(read: R, write: W) -> Self
    where
        R: IntoIterator<Item = S>,
        W: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Split {
            read: read.into_iter().map(Into::into).collect(),
            write: write.into_iter().map(Into::into).collect(),
        }
    }

    fn into_parts(self) -> (Vec<String>, Vec<String>) {
        match self {
            Self::Shared(endpoints) => (endpoints.clone(), endpoints),
            Self::Split { read, write } => (read, write),
        }
    }
}

/// Builder for constructing a [`Router`].
///
/// # Examples
///
/// ```no_run
/// # use rotor_core::{router::{EndpointPool, Router}, strategy::FallbackStrategy};
/// # use std::{sync::Arc, time::Duration};
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let router = Router::builder()
///     .pool(EndpointPool::shared(["https://rpc-a.example", "https://rpc-b.example"]))
///     .strategy(Arc::new(FallbackStrategy::new()))
///     .jail_duration(Duration::from_secs(30))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RouterBuilder {
    pool: Option<EndpointPool>,
    read_strategy: Option<Arc<dyn Strategy>>,
    write_strategy: Option<Arc<dyn Strategy>>,
    jail_policy: JailPolicy,
    request_timeout: Duration,
    write_methods: Vec<String>,
    on_endpoint_used: Option<EndpointHook>,
    transport: Option<Arc<dyn Transport>>,
}

impl RouterBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool: None,
            read_strategy: None,
            write_strategy: None,
            jail_policy: JailPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            write_methods: vec![DEFAULT_WRITE_METHOD.to_string()],
            on_endpoint_used: None,
            transport: None,
        }
    }

    #[must_use]
    pub fn pool(mut self, pool: EndpointPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Uses one strategy instance for both request classes.
    #[must_use]
    pub fn strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.read_strategy = Some(Arc::clone(&strategy));
        self.write_strategy = Some(strategy);
        self
    }

    #[must_use]
    pub fn read_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.read_strategy = Some(strategy);
        self
    }

    #[must_use]
    pub fn write_strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.write_strategy = Some(strategy);
        self
    }

    /// Sets the jail policy (default: fixed 10 seconds).
    #[must_use]
    pub fn jail_policy(mut self, policy: JailPolicy) -> Self {
        self.jail_policy = policy;
        self
    }

    /// Jails every failure for `duration`. Zero disables jailing.
    #[must_use]
    pub fn jail_duration(mut self, duration: Duration) -> Self {
        self.jail_policy = JailPolicy::fixed(duration);
        self
    }

    /// Sets the default per-attempt timeout (default: 10 seconds).
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Replaces the method names that mark a payload as a write.
    #[must_use]
    pub fn write_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Registers a callback invoked with the endpoint of every outbound attempt.
    #[must_use]
    pub fn on_endpoint_used<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_endpoint_used = Some(Arc::new(hook));
        self
    }

    /// Sets the transport (default: [`HttpTransport`] with default configuration).
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the [`Router`] and binds its strategies to it.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Missing`] if the pool or a strategy was not provided
    /// - [`ConfigError::EmptyPool`] if a request class has no endpoints
    /// - [`ConfigError::StrategyAlreadyBound`] if a strategy belongs to another router
    /// - [`ConfigError::TransportInit`] if the default transport fails to build
    pub fn build(self) -> Result<Router, ConfigError> {
        let (read_pool, write_pool) = self.pool.ok_or(ConfigError::Missing("pool"))?.into_parts();
        if read_pool.is_empty() {
            return Err(ConfigError::EmptyPool(RequestType::Read));
        }
        if write_pool.is_empty() {
            return Err(ConfigError::EmptyPool(RequestType::Write));
        }

        let read_strategy = self.read_strategy.ok_or(ConfigError::Missing("read strategy"))?;
        let write_strategy = self.write_strategy.ok_or(ConfigError::Missing("write strategy"))?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                HttpTransport::new()
                    .map_err(|e: TransportError| ConfigError::TransportInit(e.to_string()))?,
            ),
        };

        let ctx = Arc::new(RoutingContext::new(
            transport,
            JailTable::new(self.jail_policy),
            self.request_timeout,
            self.write_methods,
            self.on_endpoint_used,
        ));

        read_strategy.bind(ctx.router_id())?;
        if let Err(e) = write_strategy.bind(ctx.router_id()) {
            read_strategy.unbind(ctx.router_id());
            return Err(e);
        }

        tracing::debug!(
            router_id = ctx.router_id(),
            read_endpoints = read_pool.len(),
            write_endpoints = write_pool.len(),
            read_strategy = read_strategy.name(),
            write_strategy = write_strategy.name(),
            "router built"
        );

        Ok(Router { ctx, read_pool, write_pool, read_strategy, write_strategy })
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        strategy::{DynamicStrategy, FallbackStrategy},
        transport::MockTransport,
    };

    fn mock() -> Arc<dyn Transport> {
        Arc::new(MockTransport::new())
    }

    #[test]
    fn test_pool_required() {
        let result = RouterBuilder::new()
            .strategy(Arc::new(FallbackStrategy::new()))
            .transport(mock())
            .build();

        assert!(matches!(result, Err(ConfigError::Missing("pool"))));
    }

    #[test]
    fn test_empty_pool_rejected() {
        let result = RouterBuilder::new()
            .pool(EndpointPool::shared(Vec::<String>::new()))
            .strategy(Arc::new(FallbackStrategy::new()))
            .transport(mock())
            .build();
        assert!(matches!(result, Err(ConfigError::EmptyPool(RequestType::Read))));

        let result = RouterBuilder::new()
            .pool(EndpointPool::split(["https://a"], Vec::<&str>::new()))
            .strategy(Arc::new(FallbackStrategy::new()))
            .transport(mock())
            .build();
        assert!(matches!(result, Err(ConfigError::EmptyPool(RequestType::Write))));
    }

    #[test]
    fn test_strategy_required_per_class() {
        let result = RouterBuilder::new()
            .pool(EndpointPool::shared(["https://a"]))
            .read_strategy(Arc::new(FallbackStrategy::new()))
            .transport(mock())
            .build();

        assert!(matches!(result, Err(ConfigError::Missing("write strategy"))));
    }

    #[test]
    fn test_same_strategy_for_both_classes() {
        let strategy = Arc::new(DynamicStrategy::default());

        let router = RouterBuilder::new()
            .pool(EndpointPool::split(["https://a"], ["https://b"]))
            .strategy(strategy.clone())
            .transport(mock())
            .build()
            .unwrap();

        assert_eq!(router.pool(RequestType::Read), ["https://a".to_string()]);
        assert_eq!(router.pool(RequestType::Write), ["https://b".to_string()]);
    }

    #[test]
    fn test_strategy_cannot_serve_two_routers() {
        let strategy = Arc::new(FallbackStrategy::new());
        let build = |strategy: Arc<FallbackStrategy>| {
            RouterBuilder::new()
                .pool(EndpointPool::shared(["https://a"]))
                .strategy(strategy)
                .transport(mock())
                .build()
        };

        let _first = build(strategy.clone()).unwrap();
        let second = build(strategy);

        assert!(matches!(
            second,
            Err(ConfigError::StrategyAlreadyBound { strategy: "fallback" })
        ));
    }

    #[test]
    fn test_failed_build_releases_read_strategy() {
        let taken = Arc::new(FallbackStrategy::new());
        let fresh = Arc::new(FallbackStrategy::new());

        let _owner = RouterBuilder::new()
            .pool(EndpointPool::shared(["https://a"]))
            .strategy(taken.clone())
            .transport(mock())
            .build()
            .unwrap();

        let conflicting = RouterBuilder::new()
            .pool(EndpointPool::shared(["https://a"]))
            .read_strategy(fresh.clone())
            .write_strategy(taken)
            .transport(mock())
            .build();
        assert!(matches!(
            conflicting,
            Err(ConfigError::StrategyAlreadyBound { strategy: "fallback" })
        ));
        assert_eq!(fresh.binding().router_id(), None);

        let retry = RouterBuilder::new()
            .pool(EndpointPool::shared(["https://a"]))
            .strategy(fresh)
            .transport(mock())
            .build();
        assert!(retry.is_ok());
    }

    #[test]
    fn test_default_transport_builds() {
        let router = RouterBuilder::new()
            .pool(EndpointPool::shared(["https://a"]))
            .strategy(Arc::new(FallbackStrategy::new()))
            .build();

        assert!(router.is_ok());
    }
}
