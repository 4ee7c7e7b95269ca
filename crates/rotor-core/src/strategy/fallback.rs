use super::{candidates, send_in_turn, RouterBinding, Strategy};
use crate::{
    errors::RouterError,
    router::RoutingContext,
    types::{JsonRpcResponse, RpcPayload},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Tries endpoints in pool order, moving down the list only on failure.
#[derive(Debug, Default)]
pub struct FallbackStrategy {
    binding: RouterBinding,
}

impl FallbackStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Strategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
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
        send_in_turn(ctx, payload, self.name(), |attempts| {
            candidates(ctx, pool, attempts).next().cloned()
        })
        .await
        .map(|delivered| delivered.responses)
    }
}
