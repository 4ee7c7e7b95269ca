use super::{distinct_free, RouterBinding, Strategy};
use crate::{
    errors::{AttemptError, RouterError},
    router::RoutingContext,
    types::{JsonRpcResponse, RpcPayload},
};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Races every free endpoint and returns the first success.
///
/// Losing attempts are cancelled as soon as a winner is known and are never jailed for
/// it. Endpoints that fail before a winner emerges are jailed; racing continues with the
/// rest.
#[derive(Debug, Default)]
pub struct FastestStrategy {
    binding: RouterBinding,
}

impl FastestStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Strategy for FastestStrategy {
    fn name(&self) -> &'static str {
        "fastest"
    }

    fn binding(&self) -> &RouterBinding {
        &self.binding
    }

    async fn send(
        &self,
        ctx: &Arc<RoutingContext>,
        payload: &RpcPayload,
        pool: &[String],
    ) -> Result<Vec<JsonRpcResponse>, RouterError> {
        let free = distinct_free(ctx, pool);
        if free.is_empty() {
            return Err(RouterError::NoEndpointAvailable);
        }

        let mut errors = Vec::new();
        let mut tokens = Vec::with_capacity(free.len());
        let mut racing = FuturesUnordered::new();

        for endpoint in free {
            match ctx.create_request(payload, endpoint, None) {
                Ok(request) => {
                    tokens.push(request.cancellation_token());
                    racing.push(async move { (endpoint, request.send().await) });
                }
                Err(error) => errors.push(AttemptError { endpoint: endpoint.to_string(), error }),
            }
        }

        debug!(strategy = self.name(), racers = racing.len(), "racing endpoints");

        while let Some((endpoint, result)) = racing.next().await {
            match result {
                Ok(responses) => {
                    for token in &tokens {
                        token.cancel();
                    }
                    debug!(strategy = self.name(), endpoint = endpoint, "race won");
                    return Ok(responses);
                }
                Err(error) => {
                    if error.penalizes_endpoint() {
                        warn!(
                            strategy = self.name(),
                            endpoint = endpoint,
                            error = %error,
                            "racer failed"
                        );
                        ctx.jail(endpoint, &error);
                    }
                    errors.push(AttemptError { endpoint: endpoint.to_string(), error });
                }
            }
        }

        Err(RouterError::AllAttemptsFailed(errors))
    }
}
