use crate::types::RequestType;
use thiserror::Error;

/// Errors produced by a single outbound attempt to one endpoint.
///
/// These are surfaced to the issuing strategy, which decides whether to jail the endpoint
/// and move on. The transport never retries on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// Request exceeded the per-attempt timeout.
    #[error("Request timeout")]
    Timeout,

    /// Failed to establish a connection to the endpoint.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// HTTP-level error occurred (non-2xx status code).
    ///
    /// First field is the HTTP status code, second is the (truncated) response body.
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// Response body was not a JSON-RPC response or batch of responses.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The payload could not be serialized.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The transport's concurrency limit could not be satisfied in time.
    #[error("Concurrency limit reached: {0}")]
    ConcurrencyLimit(String),

    /// The attempt was cancelled before it completed.
    ///
    /// Expected when losing a race; never a reason to jail an endpoint.
    #[error("Request cancelled")]
    Cancelled,
}

impl TransportError {
    /// Returns `true` if this attempt was cancelled rather than failed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this attempt ran out of time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if the endpoint answered with HTTP 429.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::HttpError(429, _))
    }

    /// Returns `true` if the failure is attributable to the endpoint and should jail it.
    ///
    /// Cancellations and payloads that could not be serialized are not the endpoint's fault.
    #[must_use]
    pub fn penalizes_endpoint(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::InvalidRequest(_))
    }
}

/// A failed attempt against one endpoint, as recorded by a strategy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{endpoint}: {error}")]
pub struct AttemptError {
    pub endpoint: String,
    pub error: TransportError,
}

/// Errors returned from a logical `send`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RouterError {
    /// No attempt was made: every candidate was jailed or excluded from the start.
    #[error("No endpoint available")]
    NoEndpointAvailable,

    /// Every attempted endpoint failed. Entries are in the order the attempts failed.
    #[error("All {} attempts failed: [{}]", .0.len(), join_attempts(.0))]
    AllAttemptsFailed(Vec<AttemptError>),

    /// A direct single-endpoint call failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RouterError {
    /// Returns the per-attempt errors carried by this failure, if any.
    #[must_use]
    pub fn attempts(&self) -> &[AttemptError] {
        match self {
            Self::AllAttemptsFailed(attempts) => attempts,
            _ => &[],
        }
    }
}

fn join_attempts(attempts: &[AttemptError]) -> String {
    attempts.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Errors raised while constructing a router or its strategies.
///
/// All of these are fatal and never retried.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required builder input was not provided.
    #[error("`{0}` is required but was not provided")]
    Missing(&'static str),

    /// A request class has no endpoints.
    #[error("No endpoints configured for {0} requests")]
    EmptyPool(RequestType),

    /// The strategy instance already belongs to a different router.
    #[error("Strategy `{strategy}` is already used by another router")]
    StrategyAlreadyBound { strategy: &'static str },

    /// A strategy option is out of range.
    #[error("Invalid option for strategy `{strategy}`: {reason}")]
    InvalidStrategyOption { strategy: &'static str, reason: String },

    /// The default HTTP transport could not be built.
    #[error("Failed to initialize transport: {0}")]
    TransportInit(String),

    /// Configuration values failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Configuration sources could not be read or deserialized.
    #[error(transparent)]
    Load(#[from] config::ConfigError),
}
