use std::sync::Arc;

use tracing::{error, info, warn};

use common::{ExecutionGateway, OpenPosition, OrderRequest};

/// Submits entries and stop modifications to the execution gateway.
///
/// Every call is made exactly once. Failures are logged and reported to the
/// caller as `None`/`false`; they never propagate.
pub struct OrderExecutor {
    gateway: Arc<dyn ExecutionGateway>,
}

impl OrderExecutor {
    pub fn new(gateway: Arc<dyn ExecutionGateway>) -> Self {
        Self { gateway }
    }

    /// Send a market entry. Returns the gateway ticket on acceptance.
    pub async fn submit(&self, request: &OrderRequest) -> Option<String> {
        info!(
            symbol = %request.symbol,
            side = %request.side,
            volume = request.volume,
            price = request.price,
            sl = request.stop_loss,
            tp = request.take_profit,
            tag = %request.tag,
            "Executing order"
        );

        match self.gateway.open_position(request).await {
            Ok(ticket) => {
                info!(symbol = %request.symbol, ticket = %ticket, "Order accepted");
                Some(ticket)
            }
            Err(e) => {
                error!(symbol = %request.symbol, tag = %request.tag, error = %e, "Order failed");
                None
            }
        }
    }

    /// Move the stop of `position` to `new_stop`. Returns whether the gateway
    /// accepted the change.
    pub async fn move_stop(&self, position: &OpenPosition, new_stop: f64) -> bool {
        match self.gateway.modify_stop_loss(&position.id, new_stop).await {
            Ok(()) => {
                info!(
                    symbol = %position.symbol,
                    ticket = %position.id,
                    "SL updated to {new_stop:.5}"
                );
                true
            }
            Err(e) => {
                warn!(
                    symbol = %position.symbol,
                    ticket = %position.id,
                    new_stop = new_stop,
                    error = %e,
                    "Stop modification failed"
                );
                false
            }
        }
    }
}
