//! RPC Mock Builder for JSON-RPC endpoint testing
//!
//! Wraps mockito so each builder stands in for one upstream endpoint of a router pool.

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// Builder for creating mock JSON-RPC endpoints.
///
/// Uses mockito internally; every mock matches `POST /` by method name.
pub struct RpcMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

fn method_matcher(method: &str) -> Matcher {
    Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#))
}

fn envelope(result: &Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result
    })
    .to_string()
}

impl RpcMockBuilder {
    /// Creates a new RPC mock builder with a fresh mockito server.
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// Returns the URL of the mock server.
    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Mocks a method with a successful result, expected to be called exactly once.
    pub fn mock_method(&mut self, method: &str, result: &Value) -> &mut Self {
        self.mock_method_times(method, result, 1)
    }

    /// Mocks a method with a successful result, expected to be called `hits` times.
    pub fn mock_method_times(&mut self, method: &str, result: &Value, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(envelope(result))
            .expect(hits)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks an `eth_blockNumber` request, any number of times.
    pub fn mock_block_number(&mut self, block_number: u64) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher("eth_blockNumber"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(envelope(&json!(format!("0x{block_number:x}"))))
            .expect_at_least(1)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a JSON-RPC error object delivered with HTTP 200.
    pub fn mock_rpc_error(&mut self, method: &str, code: i32, message: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": {
                        "code": code,
                        "message": message
                    }
                })
                .to_string(),
            )
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a non-2xx status for `method`, expected to be called `hits` times.
    pub fn mock_status(&mut self, method: &str, status: usize, hits: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(status)
            .with_body(format!("upstream returned {status}"))
            .expect(hits)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a server error (500) for any request.
    pub fn mock_server_error(&mut self) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .with_status(500)
            .with_body("Internal Server Error")
            .expect_at_least(1)
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a 2xx answer whose body is not JSON-RPC.
    pub fn mock_invalid_json(&mut self, method: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(method_matcher(method))
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html>maintenance</html>")
            .create();

        self.mocks.push(mock);
        self
    }

    /// Mocks a batch request, answering with one response per result in order.
    pub fn mock_batch(&mut self, results: &[Value]) -> &mut Self {
        let body: Vec<Value> = results
            .iter()
            .enumerate()
            .map(|(index, result)| json!({ "jsonrpc": "2.0", "id": index + 1, "result": result }))
            .collect();

        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::Regex(r"^\s*\[".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(Value::Array(body).to_string())
            .create();

        self.mocks.push(mock);
        self
    }

    /// Returns a reference to the underlying mockito server for advanced mocking.
    pub fn get_server(&mut self) -> &mut ServerGuard {
        &mut self.server
    }

    /// Verifies every mock saw its expected number of calls.
    pub async fn verify_all_called(&self) -> bool {
        for mock in &self.mocks {
            if !mock.matched_async().await {
                return false;
            }
        }
        true
    }
}

/// An endpoint nothing listens on.
#[must_use]
pub fn unreachable_endpoint() -> String {
    "http://127.0.0.1:1".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rpc_mock_builder_creation() {
        let mock = RpcMockBuilder::new().await;
        assert!(mock.url().starts_with("http://"));
    }

    #[tokio::test]
    async fn test_unused_mock_is_not_verified() {
        let mut mock = RpcMockBuilder::new().await;
        mock.mock_method("eth_chainId", &json!("0x1"));

        assert!(!mock.verify_all_called().await);
    }

    #[test]
    fn test_envelope_shape() {
        let body: Value = serde_json::from_str(&envelope(&json!("0x1"))).unwrap();
        assert_eq!(body["jsonrpc"], "2.0");
        assert_eq!(body["result"], "0x1");
    }
}
