use super::{candidates, send_in_turn, RouterBinding, Strategy};
use crate::{
    errors::RouterError,
    router::RoutingContext,
    types::{JsonRpcResponse, RpcPayload},
};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;

/// Picks uniformly among free, untried endpoints, re-drawing on every attempt.
#[derive(Debug, Default)]
pub struct RandomStrategy {
    binding: RouterBinding,
}

impl RandomStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Strategy for RandomStrategy {
    fn name(&self) -> &'static str {
        "random"
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
            let free: Vec<&String> = candidates(ctx, pool, attempts).collect();
            if free.is_empty() {
                return None;
            }
            Some(free[rand::rng().random_range(0..free.len())].clone())
        })
        .await
        .map(|delivered| delivered.responses)
    }
}
