//! Core type definitions for JSON-RPC payloads and request classification.
//!
//! # Type Categories
//!
//! - [`JsonRpcRequest`], [`JsonRpcResponse`], [`JsonRpcError`]: JSON-RPC 2.0 envelopes
//! - [`RpcPayload`]: a single call or a batch of calls, sent as one logical request
//! - [`RequestType`]: the read/write class a payload is routed under
//!
//! Results are always batch-shaped: a singleton request yields a one-element `Vec`.

use serde::{Deserialize, Serialize};
use std::{borrow::Cow, fmt};

/// JSON-RPC protocol version constant to avoid repeated allocations.
pub const JSONRPC_VERSION: &str = "2.0";

/// Pre-allocated `Cow` for the JSON-RPC version.
pub const JSONRPC_VERSION_COW: Cow<'static, str> = Cow::Borrowed(JSONRPC_VERSION);

/// Method that marks a payload as a write when no other write methods are configured.
pub const DEFAULT_WRITE_METHOD: &str = "eth_sendRawTransaction";

/// Method used by block-height polling.
pub const BLOCK_NUMBER_METHOD: &str = "eth_blockNumber";

/// JSON-RPC 2.0 request structure.
///
/// # Example
///
/// ```
/// use rotor_core::types::JsonRpcRequest;
/// use serde_json::json;
///
/// let request = JsonRpcRequest::new("eth_blockNumber", None, json!(1));
///
/// assert_eq!(request.method, "eth_blockNumber");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Cow<'static, str>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    pub id: serde_json::Value,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with zero allocation for the version string.
    #[must_use]
    pub fn new(
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        id: serde_json::Value,
    ) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, method: method.into(), params, id }
    }
}

/// JSON-RPC 2.0 response structure.
///
/// A response carries either a `result` or an `error`. Error responses delivered with a
/// successful HTTP status are ordinary results as far as routing is concerned: they are
/// returned to the caller, not treated as endpoint failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: serde_json::Value,
}

fn default_version() -> Cow<'static, str> {
    JSONRPC_VERSION_COW
}

impl JsonRpcResponse {
    /// Creates a successful JSON-RPC response.
    #[must_use]
    pub fn success(result: serde_json::Value, id: serde_json::Value) -> Self {
        Self { jsonrpc: JSONRPC_VERSION_COW, result: Some(result), error: None, id }
    }

    /// Parses a response body into batch shape.
    ///
    /// Accepts either a single response object or an array of them; a single object is
    /// wrapped into a one-element vector.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if the body is neither shape.
    pub fn parse_batch(body: &[u8]) -> Result<Vec<Self>, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<JsonRpcResponse>),
            One(JsonRpcResponse),
        }

        Ok(match serde_json::from_slice::<OneOrMany>(body)? {
            OneOrMany::Many(responses) => responses,
            OneOrMany::One(response) => vec![response],
        })
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// One logical request: a single call or a batch of calls.
///
/// Serializes to the JSON-RPC wire shape, an object for `Single` and an array for `Batch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcPayload {
    Batch(Vec<JsonRpcRequest>),
    Single(JsonRpcRequest),
}

impl RpcPayload {
    /// Returns the calls carried by this payload, in order.
    #[must_use]
    pub fn calls(&self) -> &[JsonRpcRequest] {
        match self {
            Self::Single(request) => std::slice::from_ref(request),
            Self::Batch(requests) => requests,
        }
    }

    /// Returns `true` if any call in the payload uses one of `write_methods`.
    #[must_use]
    pub fn has_method_in(&self, write_methods: &[String]) -> bool {
        self.calls().iter().any(|call| write_methods.iter().any(|m| *m == call.method))
    }

    /// Serializes the payload to its JSON wire body.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if a parameter fails to serialize.
    pub fn to_body(&self) -> Result<bytes::Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(bytes::Bytes::from)
    }
}

impl From<JsonRpcRequest> for RpcPayload {
    fn from(request: JsonRpcRequest) -> Self {
        Self::Single(request)
    }
}

impl From<Vec<JsonRpcRequest>> for RpcPayload {
    fn from(requests: Vec<JsonRpcRequest>) -> Self {
        Self::Batch(requests)
    }
}

/// Request class used to pick a pool and strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Read,
    Write,
}

impl RequestType {
    /// Returns a static string representation for log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
