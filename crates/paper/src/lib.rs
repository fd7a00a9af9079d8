use std::collections::{HashMap, VecDeque};
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use common::{
    Bar, Error, ExecutionGateway, MarketDataSource, OpenPosition, OrderRequest, PositionSide,
    RejectReason, Result, TerminalSession, Tick, Timeframe,
};

/// Price increment used to express order deviation in points.
const DEFAULT_POINT: f64 = 0.00001;

/// Record of every call the paper terminal served. Used by tests and by the
/// dry-run binary's shutdown summary.
#[derive(Debug, Clone, Default)]
pub struct PaperJournal {
    pub connects: usize,
    pub refreshes: usize,
    pub disconnects: usize,
    pub fetches: HashMap<String, usize>,
    pub open_requests: Vec<OrderRequest>,
    pub stop_modifications: Vec<(String, f64)>,
    pub closed_positions: Vec<String>,
}

#[derive(Default)]
struct PaperState {
    connected: bool,
    fail_connect: bool,
    /// Full history per symbol.
    series: HashMap<String, Vec<Bar>>,
    /// Number of bars currently visible, for symbols being replayed.
    cursors: HashMap<String, usize>,
    ticks: HashMap<String, Tick>,
    positions: Vec<OpenPosition>,
    fetch_failures: HashMap<String, usize>,
    open_rejects: VecDeque<RejectReason>,
    modify_rejects: VecDeque<RejectReason>,
    next_ticket: u64,
    journal: PaperJournal,
}

impl PaperState {
    fn visible(&self, symbol: &str) -> &[Bar] {
        let Some(bars) = self.series.get(symbol) else {
            return &[];
        };
        let end = self.cursors.get(symbol).copied().unwrap_or(bars.len());
        &bars[..end.min(bars.len())]
    }

    fn quote(&self, symbol: &str, spread: f64) -> Option<Tick> {
        if let Some(tick) = self.ticks.get(symbol) {
            return Some(*tick);
        }
        self.visible(symbol).last().map(|bar| Tick {
            bid: bar.close,
            ask: bar.close + spread,
        })
    }

    /// Step every replayed symbol forward by one bar.
    fn advance_all(&mut self) {
        let mut symbols: Vec<String> = self.cursors.keys().cloned().collect();
        symbols.sort();
        for symbol in symbols {
            self.advance(&symbol);
        }
    }

    /// Reveal the next replayed bar and close positions it stops out.
    fn advance(&mut self, symbol: &str) {
        let Some(total) = self.series.get(symbol).map(Vec::len) else {
            return;
        };
        let Some(cursor) = self.cursors.get_mut(symbol) else {
            return;
        };
        if *cursor >= total {
            return;
        }
        *cursor += 1;
        let bar = self.series[symbol][*cursor - 1];

        let mut closed = Vec::new();
        self.positions.retain(|p| {
            if p.symbol != symbol {
                return true;
            }
            let hit = match p.side {
                PositionSide::Long => {
                    (p.stop_loss > 0.0 && bar.low <= p.stop_loss)
                        || (p.take_profit > 0.0 && bar.high >= p.take_profit)
                }
                PositionSide::Short => {
                    (p.stop_loss > 0.0 && bar.high >= p.stop_loss)
                        || (p.take_profit > 0.0 && bar.low <= p.take_profit)
                }
            };
            if hit {
                closed.push(p.id.clone());
            }
            !hit
        });
        for id in closed {
            info!(symbol = %symbol, ticket = %id, "Paper position closed at protective level");
            self.journal.closed_positions.push(id);
        }
    }
}

/// In-memory terminal for dry runs and tests.
///
/// Serves bars and quotes from loaded series, fills entries at the quote with
/// configurable slippage and keeps the open-position book. No real orders are
/// ever sent anywhere.
pub struct PaperTerminal {
    state: RwLock<PaperState>,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
    /// Added to the bid to form the ask when quoting from bars.
    spread: f64,
    point: f64,
}

impl PaperTerminal {
    pub fn new(slippage_bps: f64, spread: f64) -> Self {
        info!(slippage_bps = slippage_bps, spread = spread, "PaperTerminal initialized");
        Self {
            state: RwLock::new(PaperState {
                next_ticket: 1,
                ..PaperState::default()
            }),
            slippage_bps,
            spread,
            point: DEFAULT_POINT,
        }
    }

    /// Serve `bars` as-is on every fetch.
    pub async fn set_bars(&self, symbol: &str, bars: Vec<Bar>) {
        let mut state = self.state.write().await;
        state.cursors.remove(symbol);
        state.series.insert(symbol.to_string(), bars);
    }

    /// Replay `bars`: the first `warmup` are visible immediately and every
    /// `refresh` reveals one more.
    pub async fn replay(&self, symbol: &str, bars: Vec<Bar>, warmup: usize) {
        let mut state = self.state.write().await;
        state.cursors.insert(symbol.to_string(), warmup.min(bars.len()));
        state.series.insert(symbol.to_string(), bars);
    }

    /// Load `<dir>/<SYMBOL>.csv` files for replay. Returns the symbols loaded.
    ///
    /// Expected header: `timestamp,open,high,low,close,volume` with RFC 3339
    /// timestamps, oldest first.
    pub async fn load_csv_dir(&self, dir: impl AsRef<Path>, warmup: usize) -> Result<Vec<String>> {
        let mut symbols = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(symbol) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
            else {
                continue;
            };
            let bars = read_csv(&path)?;
            info!(symbol = %symbol, bars = bars.len(), "Loaded paper replay series");
            self.replay(&symbol, bars, warmup).await;
            symbols.push(symbol);
        }
        symbols.sort();
        Ok(symbols)
    }

    /// Override the quote for `symbol`.
    pub async fn set_tick(&self, symbol: &str, bid: f64, ask: f64) {
        self.state
            .write()
            .await
            .ticks
            .insert(symbol.to_string(), Tick { bid, ask });
    }

    /// Make the next `n` fetches for `symbol` report no data.
    pub async fn fail_next_fetches(&self, symbol: &str, n: usize) {
        self.state
            .write()
            .await
            .fetch_failures
            .insert(symbol.to_string(), n);
    }

    pub async fn reject_next_open(&self, reason: RejectReason) {
        self.state.write().await.open_rejects.push_back(reason);
    }

    pub async fn reject_next_modify(&self, reason: RejectReason) {
        self.state.write().await.modify_rejects.push_back(reason);
    }

    /// Refuse the next `connect` call.
    pub async fn refuse_connections(&self, refuse: bool) {
        self.state.write().await.fail_connect = refuse;
    }

    /// Seed an already-open position (e.g. one opened before startup).
    pub async fn insert_position(&self, position: OpenPosition) {
        self.state.write().await.positions.push(position);
    }

    pub async fn journal(&self) -> PaperJournal {
        self.state.read().await.journal.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.connected
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.state.read().await.connected {
            Ok(())
        } else {
            Err(Error::Connection("paper terminal is not connected".into()))
        }
    }

    fn apply_slippage(&self, side: PositionSide, price: f64) -> f64 {
        match side {
            PositionSide::Long => price * (1.0 + self.slippage_bps / 10_000.0),
            PositionSide::Short => price * (1.0 - self.slippage_bps / 10_000.0),
        }
    }
}

fn read_csv(path: &Path) -> Result<Vec<Bar>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut bars = Vec::new();
    for record in reader.deserialize::<Bar>() {
        bars.push(record?);
    }
    Ok(bars)
}

#[async_trait]
impl TerminalSession for PaperTerminal {
    async fn connect(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_connect {
            return Err(Error::Connection("paper terminal refused the connection".into()));
        }
        state.connected = true;
        state.journal.connects += 1;
        info!("Paper terminal connected");
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.ensure_connected().await?;
        let mut state = self.state.write().await;
        state.journal.refreshes += 1;
        state.advance_all();
        Ok(())
    }

    async fn disconnect(&self) {
        let mut state = self.state.write().await;
        if state.connected {
            info!("Paper terminal disconnected");
        }
        state.connected = false;
        state.journal.disconnects += 1;
    }
}

#[async_trait]
impl MarketDataSource for PaperTerminal {
    async fn fetch_recent_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>> {
        self.ensure_connected().await?;
        let mut state = self.state.write().await;
        *state.journal.fetches.entry(symbol.to_string()).or_default() += 1;

        if let Some(remaining) = state.fetch_failures.get_mut(symbol) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::DataUnavailable {
                    symbol: symbol.to_string(),
                });
            }
        }

        let visible = state.visible(symbol);
        if visible.is_empty() {
            return Err(Error::DataUnavailable {
                symbol: symbol.to_string(),
            });
        }
        let start = visible.len().saturating_sub(count);
        debug!(symbol = %symbol, timeframe = %timeframe, bars = visible.len() - start, "Paper bars served");
        Ok(visible[start..].to_vec())
    }

    async fn tick(&self, symbol: &str) -> Result<Tick> {
        self.ensure_connected().await?;
        self.state
            .read()
            .await
            .quote(symbol, self.spread)
            .ok_or_else(|| Error::DataUnavailable {
                symbol: symbol.to_string(),
            })
    }
}

#[async_trait]
impl ExecutionGateway for PaperTerminal {
    async fn count_open_positions(&self) -> Result<usize> {
        self.ensure_connected().await?;
        Ok(self.state.read().await.positions.len())
    }

    async fn open_position(&self, request: &OrderRequest) -> Result<String> {
        self.ensure_connected().await?;
        let mut state = self.state.write().await;
        state.journal.open_requests.push(request.clone());

        if let Some(reason) = state.open_rejects.pop_front() {
            return Err(reason.into());
        }

        let quote = state
            .quote(&request.symbol, self.spread)
            .ok_or(RejectReason::InvalidSymbolState)?;
        let fill_price = self.apply_slippage(request.side, quote.entry_price(request.side));

        let deviation = (fill_price - request.price).abs() / self.point;
        if deviation > f64::from(request.deviation_points) + 1e-6 {
            warn!(
                symbol = %request.symbol,
                requested = request.price,
                fill = fill_price,
                "Paper fill outside allowed deviation"
            );
            return Err(RejectReason::PriceDeviation.into());
        }

        let ticket = state.next_ticket.to_string();
        state.next_ticket += 1;
        state.positions.push(OpenPosition {
            id: ticket.clone(),
            symbol: request.symbol.clone(),
            side: request.side,
            entry_price: fill_price,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            initial_stop_loss: Some(request.stop_loss),
            volume: request.volume,
            opened_at: Utc::now(),
        });

        debug!(
            symbol = %request.symbol,
            side = %request.side,
            fill = fill_price,
            ticket = %ticket,
            tag = %request.tag,
            "Paper fill simulated"
        );
        Ok(ticket)
    }

    async fn list_open_positions(&self) -> Result<Vec<OpenPosition>> {
        self.ensure_connected().await?;
        Ok(self.state.read().await.positions.clone())
    }

    async fn modify_stop_loss(&self, position_id: &str, new_stop_loss: f64) -> Result<()> {
        self.ensure_connected().await?;
        let mut state = self.state.write().await;
        state
            .journal
            .stop_modifications
            .push((position_id.to_string(), new_stop_loss));

        if let Some(reason) = state.modify_rejects.pop_front() {
            return Err(reason.into());
        }

        let position = state
            .positions
            .iter_mut()
            .find(|p| p.id == position_id)
            .ok_or(RejectReason::UnknownPosition)?;
        position.stop_loss = new_stop_loss;
        Ok(())
    }
}
