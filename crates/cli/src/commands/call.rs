use rotor_core::{
    config::RouterConfig,
    types::{JsonRpcRequest, RpcPayload},
};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

use super::utils::{CliError, CliResult};

/// Options for a single routed call.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub method: String,
    pub params: Option<String>,
    pub id: u64,
    /// Bypasses the strategy and sends one attempt to this endpoint.
    pub endpoint: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// Builds a router from `config`, sends the call, and prints the responses as JSON.
pub async fn call(config: &RouterConfig, options: CallOptions) -> CliResult<()> {
    let payload = build_payload(&options)?;
    let router = config.build_router(None)?;

    tracing::info!(
        method = %options.method,
        request_type = router.request_type(&payload).as_str(),
        "sending request"
    );

    let responses = match &options.endpoint {
        Some(endpoint) => {
            let timeout = options.timeout_ms.map(Duration::from_millis);
            router.send_request(&payload, endpoint, timeout).await?
        }
        None => router.send(&payload).await?,
    };

    let now = Instant::now();
    for (endpoint, until) in router.jailed_endpoints() {
        tracing::debug!(
            endpoint = %endpoint,
            remaining = ?until.saturating_duration_since(now),
            "endpoint still jailed"
        );
    }

    let output = match responses.as_slice() {
        [single] => serde_json::to_string_pretty(single)?,
        many => serde_json::to_string_pretty(many)?,
    };
    println!("{output}");

    Ok(())
}

fn build_payload(options: &CallOptions) -> CliResult<RpcPayload> {
    let params = match options.params.as_deref() {
        None => None,
        Some(raw) => {
            let value: Value = serde_json::from_str(raw)?;
            if !(value.is_array() || value.is_object()) {
                return Err(CliError::General("params must be a JSON array or object".to_string()));
            }
            Some(value)
        }
    };

    let request = JsonRpcRequest::new(options.method.clone(), params, Value::from(options.id));
    Ok(RpcPayload::from(request))
}
