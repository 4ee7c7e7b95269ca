//! Outbound delivery of serialized payloads to a single endpoint.
//!
//! A [`Transport`] knows nothing about pools, jails or strategies: it posts one body to
//! one endpoint and reports what happened. [`PendingRequest`] binds a body, an endpoint
//! and a timeout to a cancellation token so a strategy can abandon attempts it no
//! longer needs.

pub mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use http::{HttpTransport, HttpTransportConfig};
#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockCall, MockTransport, Outcome, Script};

use crate::{errors::TransportError, types::JsonRpcResponse};
use async_trait::async_trait;
use bytes::Bytes;
use std::{fmt, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// Delivers a JSON body to an endpoint and returns the raw response body.
///
/// Implementations must not retry: every call is exactly one attempt, and retrying on
/// another endpoint is the caller's decision.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `body` to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] describing why the attempt failed. Implementations
    /// should honour `timeout` themselves; [`PendingRequest::send`] enforces it as well.
    async fn send(
        &self,
        endpoint: &str,
        body: Bytes,
        timeout: Duration,
    ) -> Result<Bytes, TransportError>;
}

/// One prepared attempt against one endpoint.
///
/// Dropping the request or firing its token before [`PendingRequest::send`] completes
/// abandons the attempt; a cancelled attempt fails with [`TransportError::Cancelled`].
pub struct PendingRequest {
    endpoint: String,
    body: Bytes,
    timeout: Duration,
    cancel: CancellationToken,
    transport: Arc<dyn Transport>,
}

impl PendingRequest {
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        body: Bytes,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            body,
            timeout,
            cancel: CancellationToken::new(),
            transport,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns a handle that cancels this attempt when fired.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels the attempt. Has no effect once the attempt has completed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Performs the attempt and parses the response into batch shape.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Cancelled`] if the token fired first
    /// - [`TransportError::Timeout`] if the attempt outlived its timeout
    /// - [`TransportError::InvalidResponse`] if the body is not JSON-RPC
    /// - any other error reported by the transport
    pub async fn send(self) -> Result<Vec<JsonRpcResponse>, TransportError> {
        let Self { endpoint, body, timeout, cancel, transport } = self;

        let raw = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(TransportError::Cancelled),
            outcome = tokio::time::timeout(timeout, transport.send(&endpoint, body, timeout)) => {
                outcome.map_err(|_| TransportError::Timeout)??
            }
        };

        JsonRpcResponse::parse_batch(&raw).map_err(|e| {
            tracing::debug!(endpoint = %endpoint, error = %e, "unparseable response body");
            TransportError::InvalidResponse(e.to_string())
        })
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
