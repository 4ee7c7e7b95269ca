//! Router configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: `set_default` values and serde defaults
//! 2. **Config file**: TOML file named by the `ROTOR_CONFIG` env var
//! 3. **Environment variables**: `ROTOR__*` env vars override specific fields
//!
//! # Example
//!
//! ```toml
//! request_timeout_ms = 5000
//!
//! [pool]
//! read = ["https://rpc-a.example", "https://rpc-b.example"]
//! write = ["https://rpc-a.example"]
//!
//! [strategy]
//! kind = "sequential"
//! requests_per_endpoint = 3
//!
//! [write_strategy]
//! kind = "fallback"
//!
//! [jail]
//! duration_ms = 10000
//! rate_limited_duration_ms = 60000
//! ```

use crate::{
    errors::ConfigError,
    jail::JailPolicy,
    latency::{DEFAULT_HISTORY_DEPTH, MAX_HISTORY_DEPTH},
    router::{EndpointPool, Router},
    strategy::{
        DynamicStrategy, FallbackStrategy, FastestStrategy, HighestBlockStrategy, RandomStrategy,
        SequentialStrategy, Strategy, DEFAULT_REQUESTS_PER_ENDPOINT, DEFAULT_SYNC_INTERVAL,
    },
    transport::{HttpTransport, HttpTransportConfig, Transport},
    types::DEFAULT_WRITE_METHOD,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc, time::Duration};

/// Endpoint lists per request class.
///
/// `endpoints` serves any class whose own list is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub write: Vec<String>,
}

impl PoolConfig {
    /// Resolved read endpoints.
    #[must_use]
    pub fn read_endpoints(&self) -> &[String] {
        if self.read.is_empty() {
            &self.endpoints
        } else {
            &self.read
        }
    }

    /// Resolved write endpoints.
    #[must_use]
    pub fn write_endpoints(&self) -> &[String] {
        if self.write.is_empty() {
            &self.endpoints
        } else {
            &self.write
        }
    }

    fn to_pool(&self) -> EndpointPool {
        EndpointPool::split(self.read_endpoints().to_vec(), self.write_endpoints().to_vec())
    }
}

/// Strategy selection, tagged by `kind`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    #[default]
    Fallback,
    Sequential {
        #[serde(default = "default_requests_per_endpoint")]
        requests_per_endpoint: usize,
    },
    Random,
    Dynamic {
        #[serde(default = "default_history_depth")]
        history_depth: usize,
    },
    HighestBlock {
        #[serde(default = "default_sync_interval_ms")]
        sync_interval_ms: u64,
    },
    Fastest,
}

fn default_requests_per_endpoint() -> usize {
    DEFAULT_REQUESTS_PER_ENDPOINT
}

fn default_history_depth() -> usize {
    DEFAULT_HISTORY_DEPTH
}

fn default_sync_interval_ms() -> u64 {
    u64::try_from(DEFAULT_SYNC_INTERVAL.as_millis()).unwrap_or(u64::MAX)
}

impl StrategyConfig {
    /// Instantiates the configured strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidStrategyOption`] for out-of-range options.
    pub fn build(&self) -> Result<Arc<dyn Strategy>, ConfigError> {
        Ok(match self {
            Self::Fallback => Arc::new(FallbackStrategy::new()),
            Self::Sequential { requests_per_endpoint } => {
                Arc::new(SequentialStrategy::new(*requests_per_endpoint)?)
            }
            Self::Random => Arc::new(RandomStrategy::new()),
            Self::Dynamic { history_depth } => Arc::new(DynamicStrategy::new(*history_depth)?),
            Self::HighestBlock { sync_interval_ms } => {
                Arc::new(HighestBlockStrategy::new(Duration::from_millis(*sync_interval_ms))?)
            }
            Self::Fastest => Arc::new(FastestStrategy::new()),
        })
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Sequential { requests_per_endpoint: 0 } => {
                Err("Sequential requests_per_endpoint must be greater than 0".to_string())
            }
            Self::Dynamic { history_depth: 0 } => {
                Err("Dynamic history_depth must be greater than 0".to_string())
            }
            Self::Dynamic { history_depth } if *history_depth > MAX_HISTORY_DEPTH => {
                Err(format!("Dynamic history_depth must be at most {MAX_HISTORY_DEPTH}"))
            }
            Self::HighestBlock { sync_interval_ms: 0 } => {
                Err("HighestBlock sync_interval_ms must be greater than 0".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Jail duration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JailConfig {
    /// Jail duration in milliseconds after a failure. `0` disables jailing. Defaults to
    /// `10000`.
    #[serde(default = "default_jail_duration_ms")]
    pub duration_ms: u64,

    /// Jail duration in milliseconds after an HTTP 429. Defaults to `duration_ms`.
    #[serde(default)]
    pub rate_limited_duration_ms: Option<u64>,
}

fn default_jail_duration_ms() -> u64 {
    10_000
}

impl Default for JailConfig {
    fn default() -> Self {
        Self { duration_ms: default_jail_duration_ms(), rate_limited_duration_ms: None }
    }
}

impl JailConfig {
    #[must_use]
    pub fn policy(&self) -> JailPolicy {
        let default = Duration::from_millis(self.duration_ms);
        match self.rate_limited_duration_ms {
            Some(rate_limited) => {
                JailPolicy::rate_limit_aware(default, Duration::from_millis(rate_limited))
            }
            None => JailPolicy::fixed(default),
        }
    }
}

/// Application logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Complete router configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub pool: PoolConfig,

    /// Strategy for both classes unless overridden below.
    #[serde(default)]
    pub strategy: StrategyConfig,

    #[serde(default)]
    pub read_strategy: Option<StrategyConfig>,

    #[serde(default)]
    pub write_strategy: Option<StrategyConfig>,

    #[serde(default)]
    pub jail: JailConfig,

    /// Default per-attempt timeout in milliseconds. Defaults to `10000`.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Methods that mark a payload as a write.
    #[serde(default = "default_write_methods")]
    pub write_methods: Vec<String>,

    #[serde(default)]
    pub http: HttpTransportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_write_methods() -> Vec<String> {
    vec![DEFAULT_WRITE_METHOD.to_string()]
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            strategy: StrategyConfig::default(),
            read_strategy: None,
            write_strategy: None,
            jail: JailConfig::default(),
            request_timeout_ms: default_request_timeout_ms(),
            write_methods: default_write_methods(),
            http: HttpTransportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Use `__` as a separator for nested fields (e.g., `ROTOR__JAIL__DURATION_MS=5000`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("strategy.kind", "fallback")?
            .set_default("jail.duration_ms", 10_000)?
            .set_default("request_timeout_ms", 10_000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("ROTOR").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Loads configuration from `config/rotor.toml`, or the path in `ROTOR_CONFIG`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("ROTOR_CONFIG").unwrap_or_else(|_| "config/rotor.toml".to_string());
        Self::from_file(&config_path)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validates configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        if self.pool.read_endpoints().is_empty() {
            return Err("No endpoints configured for read requests".to_string());
        }
        if self.pool.write_endpoints().is_empty() {
            return Err("No endpoints configured for write requests".to_string());
        }

        for endpoint in self.pool.read_endpoints().iter().chain(self.pool.write_endpoints()) {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(format!("Invalid endpoint URL (must be http or https): {endpoint}"));
            }
        }

        for strategy in std::iter::once(&self.strategy)
            .chain(self.read_strategy.as_ref())
            .chain(self.write_strategy.as_ref())
        {
            strategy.validate()?;
        }

        if self.request_timeout_ms == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        if self.http.concurrent_limit == 0 {
            return Err("HTTP concurrent limit must be greater than 0".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }

    /// Builds a [`Router`] from this configuration.
    ///
    /// Uses `transport` if given, otherwise an [`HttpTransport`] built from `http`. When
    /// neither `read_strategy` nor `write_strategy` is set, both classes share one
    /// strategy instance.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Invalid`] if [`validate`](Self::validate) fails
    /// - [`ConfigError::TransportInit`] if the HTTP transport fails to build
    pub fn build_router(
        &self,
        transport: Option<Arc<dyn Transport>>,
    ) -> Result<Router, ConfigError> {
        self.validate().map_err(ConfigError::Invalid)?;

        let transport: Arc<dyn Transport> = match transport {
            Some(transport) => transport,
            None => Arc::new(
                HttpTransport::with_config(self.http.clone())
                    .map_err(|e| ConfigError::TransportInit(e.to_string()))?,
            ),
        };

        let builder = Router::builder()
            .pool(self.pool.to_pool())
            .jail_policy(self.jail.policy())
            .request_timeout(self.request_timeout())
            .write_methods(self.write_methods.iter().cloned())
            .transport(transport);

        let builder = if self.read_strategy.is_none() && self.write_strategy.is_none() {
            builder.strategy(self.strategy.build()?)
        } else {
            builder
                .read_strategy(self.read_strategy.as_ref().unwrap_or(&self.strategy).build()?)
                .write_strategy(self.write_strategy.as_ref().unwrap_or(&self.strategy).build()?)
        };

        builder.build()
    }
}
