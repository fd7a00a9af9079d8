pub mod controller;
pub mod executor;
pub mod fetch;

pub use controller::{CycleReport, Terminal, TradeController};
pub use executor::OrderExecutor;
pub use fetch::{fetch_with_retry, RetryPolicy};
