//! Per-endpoint sliding windows of recent request latencies.
//!
//! Each endpoint keeps at most `depth` samples in insertion order; recording past the
//! depth evicts the oldest sample. Only successful attempts are recorded by callers.

use dashmap::DashMap;
use std::{collections::VecDeque, time::Duration};

/// Default number of samples kept per endpoint.
pub const DEFAULT_HISTORY_DEPTH: usize = 5;

/// Largest accepted number of samples per endpoint.
pub const MAX_HISTORY_DEPTH: usize = 1024;

/// Bounded latency history for a set of endpoints.
///
/// Mutation happens through `&self`; each endpoint's window sits behind its own
/// `DashMap` shard lock, which is never held across an await point.
#[derive(Debug)]
pub struct LatencyWindow {
    samples: DashMap<String, VecDeque<Duration>>,
    depth: usize,
}

impl LatencyWindow {
    /// Creates an empty window keeping `depth` samples per endpoint.
    ///
    /// A depth of zero is clamped to one.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self { samples: DashMap::new(), depth: depth.max(1) }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Records one latency sample for `endpoint`, evicting the oldest beyond depth.
    pub fn record(&self, endpoint: &str, latency: Duration) {
        let mut window = self
            .samples
            .entry(endpoint.to_string())
            .or_insert_with(VecDeque::new);

        if window.len() == self.depth {
            window.pop_front();
        }
        window.push_back(latency);
    }

    /// Arithmetic mean of the recorded samples.
    ///
    /// An endpoint with no samples has a mean of zero, so untried endpoints rank first.
    #[must_use]
    pub fn mean(&self, endpoint: &str) -> Duration {
        let Some(window) = self.samples.get(endpoint) else {
            return Duration::ZERO;
        };
        if window.is_empty() {
            return Duration::ZERO;
        }

        let total: Duration = window.iter().sum();
        // Window length is bounded by depth, which always fits in u32 in practice.
        let len = u32::try_from(window.len()).unwrap_or(u32::MAX);
        total / len
    }

    /// Number of samples currently held for `endpoint`.
    #[must_use]
    pub fn len(&self, endpoint: &str) -> usize {
        self.samples.get(endpoint).map_or(0, |window| window.len())
    }
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}
