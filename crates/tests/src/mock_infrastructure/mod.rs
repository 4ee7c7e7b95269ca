//! Mock Infrastructure for Testing the Rotor Router
//!
//! Mockito-backed stand-ins for upstream JSON-RPC endpoints, so routers can be exercised
//! over real HTTP without network access.
//!
//! ## Usage
//!
//! ```ignore
//! use tests::mock_infrastructure::RpcMockBuilder;
//!
//! let mut upstream = RpcMockBuilder::new().await;
//! upstream.mock_method("eth_chainId", &json!("0x1"));
//!
//! // Put upstream.url() into the router's pool
//! ```

pub mod rpc_mock;

pub use rpc_mock::{unreachable_endpoint, RpcMockBuilder};
