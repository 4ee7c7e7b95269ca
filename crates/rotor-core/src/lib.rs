//! # Rotor Core
//!
//! Resilient client-side routing of JSON-RPC calls across a pool of interchangeable
//! endpoints.
//!
//! - **[`router`]**: the [`Router`](router::Router) dispatcher. Classifies each payload
//!   as a read or a write, waits while every endpoint of the matching pool is jailed,
//!   and delegates to the strategy bound to that class.
//!
//! - **[`strategy`]**: interchangeable selection policies: ordered fallback, quota round
//!   robin, uniform random, latency ranked, block-height ranked with background polling,
//!   and first-to-respond racing.
//!
//! - **[`jail`]**: temporary exclusion of failing endpoints with a pluggable duration
//!   policy.
//!
//! - **[`transport`]**: the single-attempt delivery capability, with a `reqwest` based
//!   [`HttpTransport`](transport::HttpTransport).
//!
//! - **[`config`]**: layered TOML and environment configuration that builds a router.
//!
//! ## Request Flow
//!
//! ```text
//! Router::send(payload)
//!       │
//!       ▼
//! ┌──────────────┐
//! │   Classify   │ ─── any write method ──► write pool + write strategy
//! └──────┬───────┘
//!        │ read
//!        ▼
//! ┌──────────────┐
//! │ All jailed?  │ ─── yes ──► sleep until earliest expiry
//! └──────┬───────┘
//!        │
//!        ▼
//! ┌──────────────┐      failure: jail, exclude, pick again
//! │   Strategy   │ ◄──────────────────────────────┐
//! └──────┬───────┘                                │
//!        ▼                                        │
//!   Transport attempt ────────────────────────────┘
//!        │ success
//!        ▼
//!   Vec<JsonRpcResponse>
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use rotor_core::{
//!     router::{EndpointPool, Router},
//!     strategy::FastestStrategy,
//!     types::{JsonRpcRequest, RpcPayload},
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::builder()
//!     .pool(EndpointPool::shared(["https://rpc-a.example", "https://rpc-b.example"]))
//!     .strategy(Arc::new(FastestStrategy::new()))
//!     .build()?;
//!
//! let payload = RpcPayload::from(JsonRpcRequest::new("eth_blockNumber", None, 1.into()));
//! let responses = router.send(&payload).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod jail;
pub mod latency;
pub mod router;
pub mod strategy;
pub mod transport;
pub mod types;

pub use errors::{ConfigError, RouterError, TransportError};
pub use router::{EndpointPool, Router, RouterBuilder};
