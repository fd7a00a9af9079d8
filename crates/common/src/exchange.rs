use async_trait::async_trait;

use crate::{Bar, OpenPosition, OrderRequest, Result, Tick, Timeframe};

/// Lifecycle of the terminal connection shared by data and execution.
#[async_trait]
pub trait TerminalSession: Send + Sync {
    /// Establish the connection. Failure is fatal at startup.
    async fn connect(&self) -> Result<()>;

    /// Called once at the start of every trading cycle, before any other
    /// call in that cycle.
    async fn refresh(&self) -> Result<()> {
        Ok(())
    }

    /// Tear the connection down. Must be safe to call more than once.
    async fn disconnect(&self);
}

/// Source of historical bars and live quotes.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// The `count` most recent bars for `symbol`, oldest first.
    /// Returns `Error::DataUnavailable` when the terminal has no bars.
    async fn fetch_recent_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>>;

    /// Latest bid/ask for `symbol`.
    async fn tick(&self, symbol: &str) -> Result<Tick>;
}

/// Abstraction over the broker.
///
/// The gateway owns every open position and is the single source of truth
/// for capacity and stop levels. Rejections are reported as
/// `Error::OrderRejected`.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    async fn count_open_positions(&self) -> Result<usize>;

    /// Place a market entry and return the gateway's position ticket.
    async fn open_position(&self, request: &OrderRequest) -> Result<String>;

    async fn list_open_positions(&self) -> Result<Vec<OpenPosition>>;

    async fn modify_stop_loss(&self, position_id: &str, new_stop_loss: f64) -> Result<()>;
}
