//! Temporary exclusion of endpoints after failures.
//!
//! A jailed endpoint is skipped by every strategy until its expiry passes. Expiry is
//! evaluated lazily against the current time: entries are never removed, a stale entry
//! is simply ignored until the next jailing overwrites it.

use crate::errors::TransportError;
use dashmap::DashMap;
use std::{fmt, sync::Arc, time::Duration};
use tokio::time::Instant;

/// Default jail duration applied when none is configured.
pub const DEFAULT_JAIL_DURATION: Duration = Duration::from_secs(10);

type JailFn = dyn Fn(&TransportError, &str) -> Duration + Send + Sync;

/// Decides how long an endpoint stays jailed after a failed attempt.
///
/// A resolved duration of zero disables jailing for that failure.
#[derive(Clone)]
pub enum JailPolicy {
    /// Same duration for every failure.
    Fixed(Duration),
    /// Duration computed from the failure and the endpoint.
    Dynamic(Arc<JailFn>),
}

impl JailPolicy {
    /// Jails every failing endpoint for `duration`.
    #[must_use]
    pub fn fixed(duration: Duration) -> Self {
        Self::Fixed(duration)
    }

    /// Never jails.
    #[must_use]
    pub fn disabled() -> Self {
        Self::Fixed(Duration::ZERO)
    }

    /// Computes the duration per failure.
    #[must_use]
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&TransportError, &str) -> Duration + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// Jails rate-limited endpoints (HTTP 429) for `rate_limited`, everything else for
    /// `default`.
    #[must_use]
    pub fn rate_limit_aware(default: Duration, rate_limited: Duration) -> Self {
        Self::dynamic(move |error, _| if error.is_rate_limited() { rate_limited } else { default })
    }

    /// Resolves the jail duration for a failure.
    #[must_use]
    pub fn duration_for(&self, error: &TransportError, endpoint: &str) -> Duration {
        match self {
            Self::Fixed(duration) => *duration,
            Self::Dynamic(f) => f(error, endpoint),
        }
    }
}

impl Default for JailPolicy {
    fn default() -> Self {
        Self::Fixed(DEFAULT_JAIL_DURATION)
    }
}

impl fmt::Debug for JailPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(duration) => f.debug_tuple("Fixed").field(duration).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Per-endpoint jail expiries.
///
/// Writes are last-write-wins: a later jailing replaces the expiry even if it is earlier
/// than the one it overwrites.
#[derive(Debug, Default)]
pub struct JailTable {
    expiries: DashMap<String, Instant>,
    policy: JailPolicy,
}

impl JailTable {
    #[must_use]
    pub fn new(policy: JailPolicy) -> Self {
        Self { expiries: DashMap::new(), policy }
    }

    /// Returns `true` while `endpoint` has an expiry in the future.
    #[must_use]
    pub fn is_jailed(&self, endpoint: &str) -> bool {
        self.expiries.get(endpoint).is_some_and(|until| *until > Instant::now())
    }

    /// Returns the recorded expiry for `endpoint`, stale or not.
    #[must_use]
    pub fn jailed_until(&self, endpoint: &str) -> Option<Instant> {
        self.expiries.get(endpoint).map(|until| *until)
    }

    /// Applies the policy to a failure and records the new expiry.
    ///
    /// Returns the duration applied, or `None` if the policy resolved to zero and the
    /// table was left untouched.
    pub fn jail(&self, endpoint: &str, error: &TransportError) -> Option<Duration> {
        let duration = self.policy.duration_for(error, endpoint);
        if duration.is_zero() {
            return None;
        }

        self.expiries.insert(endpoint.to_string(), Instant::now() + duration);
        Some(duration)
    }

    /// Returns the endpoints of `pool` that are not jailed, in pool order.
    #[must_use]
    pub fn free<'a>(&self, pool: &'a [String]) -> Vec<&'a str> {
        pool.iter().map(String::as_str).filter(|endpoint| !self.is_jailed(endpoint)).collect()
    }

    /// Returns the earliest expiry among `pool` if every endpoint in it is jailed.
    #[must_use]
    pub fn earliest_release(&self, pool: &[String]) -> Option<Instant> {
        let now = Instant::now();
        let mut earliest: Option<Instant> = None;

        for endpoint in pool {
            let until = self.jailed_until(endpoint).filter(|until| *until > now)?;
            earliest = Some(earliest.map_or(until, |current| current.min(until)));
        }

        earliest
    }

    /// Returns every endpoint currently jailed with its expiry.
    #[must_use]
    pub fn jailed(&self) -> Vec<(String, Instant)> {
        let now = Instant::now();
        self.expiries
            .iter()
            .filter(|entry| *entry.value() > now)
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}
