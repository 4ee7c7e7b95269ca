//! Integration Tests for the Rotor JSON-RPC Router
//!
//! Every test drives a real [`HttpTransport`](rotor_core::transport::HttpTransport)
//! against mockito servers:
//!
//! - `router_tests`: classification, backpressure, hooks and config-built routers
//! - `strategy_tests`: each selection strategy over HTTP
//! - `failover_tests`: jailing and failover on transport, HTTP and parse failures
//! - `mock_infrastructure`: reusable mock endpoints
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --package tests
//! ```

#[cfg(test)]
mod failover_tests;

#[cfg(test)]
mod router_tests;

#[cfg(test)]
mod strategy_tests;

/// Mock infrastructure for testing
pub mod mock_infrastructure;
