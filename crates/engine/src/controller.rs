use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use common::{Config, ExecutionGateway, MarketDataSource, OrderRequest, Result, TerminalSession};
use risk::RiskManager;
use strategy::indicators::{atr, last_value};
use strategy::{Detector, PatternDetector, StrategyConfig};

use crate::executor::OrderExecutor;
use crate::fetch::{fetch_with_retry, RetryPolicy};

/// The three faces of a trading terminal, as used by the controller.
#[derive(Clone)]
pub struct Terminal {
    pub session: Arc<dyn TerminalSession>,
    pub data: Arc<dyn MarketDataSource>,
    pub gateway: Arc<dyn ExecutionGateway>,
}

impl Terminal {
    /// Use a single implementation for all three roles.
    pub fn from_shared<T>(terminal: Arc<T>) -> Self
    where
        T: TerminalSession + MarketDataSource + ExecutionGateway + 'static,
    {
        Self {
            session: terminal.clone(),
            data: terminal.clone(),
            gateway: terminal,
        }
    }
}

/// What one cycle did. Returned for tests and the debug log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Open positions at cycle start; `None` if the gateway could not say.
    pub open_at_start: Option<usize>,
    pub symbols_scanned: usize,
    pub symbols_skipped: usize,
    pub signals: usize,
    pub orders_placed: usize,
    pub orders_failed: usize,
    pub stops_moved: usize,
    pub stop_failures: usize,
}

/// Why the entry scan stopped early.
enum ScanStop {
    CapacityFull,
    CountUnavailable,
}

/// Drives the sample → detect → enter → maintain loop.
pub struct TradeController {
    settings: Config,
    detector: Detector,
    strategy: StrategyConfig,
    risk: RiskManager,
    terminal: Terminal,
    executor: OrderExecutor,
    retry: RetryPolicy,
    shutdown: CancellationToken,
}

impl TradeController {
    pub fn new(
        settings: Config,
        strategy: StrategyConfig,
        risk: RiskManager,
        terminal: Terminal,
        shutdown: CancellationToken,
    ) -> Self {
        let detector = Detector::from_config(&strategy);
        let executor = OrderExecutor::new(terminal.gateway.clone());
        Self {
            settings,
            detector,
            strategy,
            risk,
            terminal,
            executor,
            retry: RetryPolicy::default(),
            shutdown,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Connect, run cycles until cancelled, then disconnect.
    ///
    /// A failed connect is fatal. Cancellation is only observed between
    /// cycles; a cycle in progress always completes. `disconnect` is called
    /// on every exit path, including a panic inside a cycle, which is
    /// resumed once the session is down.
    pub async fn run(&self) -> Result<()> {
        let outcome = AssertUnwindSafe(self.run_session()).catch_unwind().await;
        self.terminal.session.disconnect().await;
        match outcome {
            Ok(result) => result,
            Err(panic) => {
                error!("Trading loop panicked; terminal disconnected");
                std::panic::resume_unwind(panic)
            }
        }
    }

    async fn run_session(&self) -> Result<()> {
        if let Err(e) = self.terminal.session.connect().await {
            error!(error = %e, "Failed to connect to the trading terminal");
            return Err(e);
        }

        info!(
            strategy = %self.detector.name(),
            max_trades = self.risk.max_concurrent_trades(),
            symbols = ?self.settings.watchlist,
            timeframe = %self.settings.timeframe,
            "Starting trading loop with {} strategy (max {} concurrent trades)",
            self.detector.name().to_uppercase(),
            self.risk.max_concurrent_trades()
        );

        loop {
            let report = self.run_cycle().await;
            debug!(?report, "Cycle complete");

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutting down trading loop");
                    break;
                }
                _ = tokio::time::sleep(self.settings.cycle_interval) => {}
            }
        }
        Ok(())
    }

    /// One full cycle: refresh, capacity check, entry scan, trade maintenance.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let max = self.risk.max_concurrent_trades();

        if let Err(e) = self.terminal.session.refresh().await {
            warn!(error = %e, "Terminal refresh failed");
        }

        match self.terminal.gateway.count_open_positions().await {
            Ok(open) => {
                report.open_at_start = Some(open);
                info!("Current open trades: {open}/{max}");
                if self.risk.has_capacity(open) {
                    self.scan_watchlist(&mut report).await;
                } else {
                    info!("Max trades reached ({open}/{max}). Skipping entry scan.");
                }
            }
            Err(e) => {
                warn!(error = %e, "Open position count unavailable; skipping entry scan");
            }
        }

        self.maintain_positions(&mut report).await;
        report
    }

    async fn scan_watchlist(&self, report: &mut CycleReport) {
        for symbol in &self.settings.watchlist {
            report.symbols_scanned += 1;
            match self.scan_symbol(symbol, report).await {
                Ok(()) => {}
                Err(ScanStop::CapacityFull) | Err(ScanStop::CountUnavailable) => break,
            }
        }
    }

    /// Evaluate one symbol and enter on a signal. Per-symbol problems are
    /// logged and swallowed; only capacity conditions end the scan.
    async fn scan_symbol(&self, symbol: &str, report: &mut CycleReport) -> Result<(), ScanStop> {
        let bars = match fetch_with_retry(
            self.terminal.data.as_ref(),
            symbol,
            self.settings.timeframe,
            self.settings.bar_count,
            self.retry,
        )
        .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Skipping symbol");
                report.symbols_skipped += 1;
                return Ok(());
            }
        };

        let atr_value = last_value(&atr(&bars, self.strategy.atr_period));

        let Some(detection) = self.detector.detect(&bars, &self.strategy) else {
            debug!(symbol = %symbol, "No signal");
            return Ok(());
        };
        report.signals += 1;
        info!(
            symbol = %symbol,
            signal = %detection.signal,
            pattern = %detection.pattern,
            "Signal generated"
        );

        let max = self.risk.max_concurrent_trades();
        let open = self.open_count().await?;
        if !self.risk.has_capacity(open) {
            info!("Max trades reached ({open}/{max}). Skipping new trade.");
            return Err(ScanStop::CapacityFull);
        }

        let side = detection.signal.side();
        let price = match self.terminal.data.tick(symbol).await {
            Ok(tick) => tick.entry_price(side),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Quote unavailable; skipping entry");
                report.symbols_skipped += 1;
                return Ok(());
            }
        };

        let levels = match self.risk.entry_levels(
            symbol,
            side,
            price,
            atr_value.unwrap_or(f64::NAN),
        ) {
            Ok(levels) => levels,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "Skipping entry");
                report.symbols_skipped += 1;
                return Ok(());
            }
        };

        let tag = format!("{}_{}", self.detector.variant().tag(), detection.signal);
        let request = OrderRequest::market(
            symbol,
            side,
            self.settings.lot_size,
            price,
            levels.stop_loss,
            levels.take_profit,
            tag,
        )
        .with_deviation(self.settings.order_deviation_points)
        .with_magic(self.settings.magic_number);

        match self.executor.submit(&request).await {
            Some(_) => {
                report.orders_placed += 1;
                info!(
                    "{} Trade: {} {} at {} (Trade {}/{})",
                    self.detector.name().to_uppercase(),
                    symbol,
                    detection.signal.to_string().to_uppercase(),
                    price,
                    open + 1,
                    max
                );
            }
            None => report.orders_failed += 1,
        }

        if !self.risk.has_capacity(self.open_count().await?) {
            info!("Capacity reached; ending entry scan");
            return Err(ScanStop::CapacityFull);
        }
        Ok(())
    }

    async fn open_count(&self) -> Result<usize, ScanStop> {
        self.terminal
            .gateway
            .count_open_positions()
            .await
            .map_err(|e| {
                warn!(error = %e, "Open position count unavailable; ending entry scan");
                ScanStop::CountUnavailable
            })
    }

    /// Evaluate the trailing stop of every open position.
    async fn maintain_positions(&self, report: &mut CycleReport) {
        let positions = match self.terminal.gateway.list_open_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                warn!(error = %e, "Open positions unavailable; skipping maintenance");
                return;
            }
        };

        for position in &positions {
            let price = match self.terminal.data.tick(&position.symbol).await {
                Ok(tick) => tick.exit_price(position.side),
                Err(e) => {
                    warn!(
                        symbol = %position.symbol,
                        ticket = %position.id,
                        error = %e,
                        "Quote unavailable; skipping position"
                    );
                    continue;
                }
            };

            if let Some(new_stop) = self.risk.trailing_update(position, price) {
                if self.executor.move_stop(position, new_stop).await {
                    report.stops_moved += 1;
                } else {
                    report.stop_failures += 1;
                }
            }
        }
    }
}
