//! Scripted in-memory transport for tests.
//!
//! Each endpoint follows a [`Script`]: an optional delay, then either a success or a
//! fixed error. Successful reads answer every call with the endpoint's own name as the
//! result, so tests can tell which endpoint served a request. `eth_blockNumber` calls
//! answer with the scripted block height in hex.

use crate::{
    errors::TransportError,
    transport::Transport,
    types::{JsonRpcResponse, RpcPayload, BLOCK_NUMBER_METHOD},
};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::json;
use std::time::Duration;

/// What an endpoint does once its delay has elapsed.
#[derive(Debug, Clone)]
pub enum Outcome {
    Ok,
    Fail(TransportError),
}

/// Scripted behavior of one endpoint.
#[derive(Debug, Clone)]
pub struct Script {
    pub delay: Duration,
    pub outcome: Outcome,
    pub block_height: u64,
}

impl Script {
    /// Answers immediately.
    #[must_use]
    pub fn ok() -> Self {
        Self { delay: Duration::ZERO, outcome: Outcome::Ok, block_height: 0 }
    }

    /// Fails immediately with `error`.
    #[must_use]
    pub fn fail(error: TransportError) -> Self {
        Self { delay: Duration::ZERO, outcome: Outcome::Fail(error), block_height: 0 }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_block_height(mut self, height: u64) -> Self {
        self.block_height = height;
        self
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::ok()
    }
}

/// A call observed by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub endpoint: String,
    pub method: String,
}

/// In-memory [`Transport`] driven by per-endpoint scripts.
///
/// Endpoints without a script answer successfully with no delay.
#[derive(Debug, Default)]
pub struct MockTransport {
    scripts: DashMap<String, Script>,
    calls: Mutex<Vec<MockCall>>,
    completed: Mutex<Vec<MockCall>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the script for `endpoint`. Takes effect for calls that start afterwards.
    pub fn set_script(&self, endpoint: &str, script: Script) {
        self.scripts.insert(endpoint.to_string(), script);
    }

    /// Every call that reached the transport, including ones later cancelled.
    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Endpoints that received a call for `method`, in arrival order.
    #[must_use]
    pub fn endpoints_called_for(&self, method: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method == method)
            .map(|call| call.endpoint.clone())
            .collect()
    }

    /// Endpoints that received anything other than a block-height poll, in arrival order.
    #[must_use]
    pub fn routed_endpoints(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.method != BLOCK_NUMBER_METHOD)
            .map(|call| call.endpoint.clone())
            .collect()
    }

    /// Calls that ran to completion, successfully or not.
    #[must_use]
    pub fn completed(&self) -> Vec<MockCall> {
        self.completed.lock().clone()
    }

    fn answer(endpoint: &str, payload: &RpcPayload, block_height: u64) -> serde_json::Value {
        let respond = |call: &crate::types::JsonRpcRequest| {
            let result = if call.method == BLOCK_NUMBER_METHOD {
                json!(format!("{block_height:#x}"))
            } else {
                json!(endpoint)
            };
            JsonRpcResponse::success(result, call.id.clone())
        };

        match payload {
            RpcPayload::Single(call) => json!(respond(call)),
            RpcPayload::Batch(calls) => json!(calls.iter().map(respond).collect::<Vec<_>>()),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        endpoint: &str,
        body: Bytes,
        _timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        let payload: RpcPayload = serde_json::from_slice(&body)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let call = MockCall {
            endpoint: endpoint.to_string(),
            method: payload.calls().first().map(|c| c.method.clone()).unwrap_or_default(),
        };
        self.calls.lock().push(call.clone());

        let script = self.scripts.get(endpoint).map(|s| s.clone()).unwrap_or_default();
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }

        self.completed.lock().push(call);

        match script.outcome {
            Outcome::Fail(error) => Err(error),
            Outcome::Ok => {
                let answer = Self::answer(endpoint, &payload, script.block_height);
                serde_json::to_vec(&answer)
                    .map(Bytes::from)
                    .map_err(|e| TransportError::InvalidResponse(e.to_string()))
            }
        }
    }
}
