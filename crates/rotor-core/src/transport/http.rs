use crate::{errors::TransportError, transport::Transport};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Maximum number of response body bytes kept in an [`TransportError::HttpError`].
const MAX_ERROR_BODY_LEN: usize = 256;

/// Configuration for HTTP transport concurrency and connection behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpTransportConfig {
    /// Maximum number of concurrent HTTP requests allowed
    pub concurrent_limit: usize,
    /// Permit acquisition timeout in milliseconds under normal load
    pub permit_timeout_ms: u64,
    /// Permit acquisition timeout in milliseconds when permits are scarce
    pub permit_timeout_scarce_ms: u64,
    /// Number of available permits below which they are considered scarce
    pub scarce_permit_threshold: usize,
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 1000,
            permit_timeout_ms: 500,
            permit_timeout_scarce_ms: 200,
            scarce_permit_threshold: 100,
            connect_timeout_ms: 5_000,
            user_agent: concat!("rotor/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// HTTP POST transport with semaphore-based concurrency control.
///
/// Every call is one attempt: non-2xx statuses and network failures are returned to the
/// caller as-is, never retried here.
pub struct HttpTransport {
    client: Client,
    concurrent_limit: Arc<Semaphore>,
    config: HttpTransportConfig,
}

/// RAII guard ensuring semaphore permits are always released.
struct PermitGuard {
    _permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
}

impl PermitGuard {
    fn new(permit: OwnedSemaphorePermit, semaphore: Arc<Semaphore>) -> Self {
        Self { _permit: permit, semaphore }
    }

    fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Drop for PermitGuard {
    fn drop(&mut self) {
        tracing::trace!(
            available_permits = self.semaphore.available_permits(),
            "permit guard dropped"
        );
    }
}

impl HttpTransport {
    /// Creates a transport with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Creates a transport with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(100)
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.as_str())
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                TransportError::ConnectionFailed(format!("HTTP client build failed: {e}"))
            })?;

        Ok(Self {
            client,
            concurrent_limit: Arc::new(Semaphore::new(config.concurrent_limit.max(1))),
            config,
        })
    }

    /// Sanitizes network errors to prevent information disclosure.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_decode() {
            "response decode error".to_string()
        } else if error.is_redirect() {
            "redirect not followed".to_string()
        } else {
            "network error".to_string()
        }
    }

    fn truncate_body(mut text: String) -> String {
        if text.len() <= MAX_ERROR_BODY_LEN {
            return text;
        }
        let mut cut = MAX_ERROR_BODY_LEN;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("... (truncated)");
        text
    }

    async fn acquire_permit(&self, endpoint: &str) -> Result<PermitGuard, TransportError> {
        let permit_timeout =
            if self.concurrent_limit.available_permits() < self.config.scarce_permit_threshold {
                Duration::from_millis(self.config.permit_timeout_scarce_ms)
            } else {
                Duration::from_millis(self.config.permit_timeout_ms)
            };

        let permit = tokio::time::timeout(
            permit_timeout,
            Arc::clone(&self.concurrent_limit).acquire_owned(),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                endpoint = endpoint,
                available_permits = self.concurrent_limit.available_permits(),
                "http transport semaphore acquisition timeout"
            );
            TransportError::ConcurrencyLimit(endpoint.to_string())
        })?
        .map_err(|_| TransportError::ConcurrencyLimit(endpoint.to_string()))?;

        Ok(PermitGuard::new(permit, Arc::clone(&self.concurrent_limit)))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &str,
        body: Bytes,
        timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        let permit_guard = self.acquire_permit(endpoint).await?;

        tracing::trace!(
            endpoint = endpoint,
            available_permits = permit_guard.available_permits(),
            "http request started"
        );

        let response = self
            .client
            .post(endpoint)
            .header("content-type", "application/json")
            .body(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::ConnectionFailed(Self::sanitize_network_error(&e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::trace!(
                endpoint = endpoint,
                status = status.as_u16(),
                available_permits = permit_guard.available_permits(),
                "http request failed"
            );
            return Err(TransportError::HttpError(status.as_u16(), Self::truncate_body(text)));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::ConnectionFailed(Self::sanitize_network_error(&e))
            }
        })?;

        tracing::trace!(
            endpoint = endpoint,
            available_permits = permit_guard.available_permits(),
            "http request completed"
        );
        Ok(bytes)
    }
}
