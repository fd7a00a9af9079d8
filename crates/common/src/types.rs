use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// One OHLCV candle as delivered by the market-data terminal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Bar granularity requested from the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Timeframe {
    M1,
    M5,
    #[default]
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "M1" => Ok(Timeframe::M1),
            "M5" => Ok(Timeframe::M5),
            "M15" => Ok(Timeframe::M15),
            "M30" => Ok(Timeframe::M30),
            "H1" => Ok(Timeframe::H1),
            "H4" => Ok(Timeframe::H4),
            "D1" => Ok(Timeframe::D1),
            other => Err(Error::Config(format!("unknown timeframe '{other}'"))),
        }
    }
}

/// Directional signal emitted by a pattern detector.
/// "No signal" is expressed as `Option::None` by the detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
}

impl Signal {
    /// Side of the position this signal would open.
    pub fn side(&self) -> PositionSide {
        match self {
            Signal::Buy => PositionSide::Long,
            Signal::Sell => PositionSide::Short,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "buy"),
            Signal::Sell => write!(f, "sell"),
        }
    }
}

/// Side of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// Best bid/ask for a symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub bid: f64,
    pub ask: f64,
}

impl Tick {
    /// Price at which a new position on `side` would be filled.
    pub fn entry_price(&self, side: PositionSide) -> f64 {
        match side {
            PositionSide::Long => self.ask,
            PositionSide::Short => self.bid,
        }
    }

    /// Price at which an open position on `side` would be closed.
    pub fn exit_price(&self, side: PositionSide) -> f64 {
        match side {
            PositionSide::Long => self.bid,
            PositionSide::Short => self.ask,
        }
    }
}

/// A market entry with protective levels, handed to the execution gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client-side correlation id.
    pub id: String,
    pub symbol: String,
    pub side: PositionSide,
    pub volume: f64,
    /// Quoted price the levels were computed from.
    pub price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Maximum accepted distance between quoted and filled price, in points.
    pub deviation_points: u32,
    pub magic: u64,
    /// Free-text comment, e.g. `abcd_buy`.
    pub tag: String,
}

impl OrderRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn market(
        symbol: impl Into<String>,
        side: PositionSide,
        volume: f64,
        price: f64,
        stop_loss: f64,
        take_profit: f64,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            volume,
            price,
            stop_loss,
            take_profit,
            deviation_points: 10,
            magic: 123_456,
            tag: tag.into(),
        }
    }

    pub fn with_deviation(mut self, points: u32) -> Self {
        self.deviation_points = points;
        self
    }

    pub fn with_magic(mut self, magic: u64) -> Self {
        self.magic = magic;
        self
    }
}

/// An open position as reported by the execution gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    /// Gateway ticket.
    pub id: String,
    pub symbol: String,
    pub side: PositionSide,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Stop-loss at the time of entry, when the gateway tracks it.
    pub initial_stop_loss: Option<f64>,
    pub volume: f64,
    pub opened_at: DateTime<Utc>,
}

/// Reason the execution gateway declined an open or modify request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    BrokerRejected { code: u32, message: String },
    PriceDeviation,
    InvalidSymbolState,
    UnknownPosition,
    Other(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::BrokerRejected { code, message } => {
                write!(f, "broker rejected (retcode {code}): {message}")
            }
            RejectReason::PriceDeviation => write!(f, "price deviation exceeded"),
            RejectReason::InvalidSymbolState => write!(f, "symbol not tradable"),
            RejectReason::UnknownPosition => write!(f, "unknown position"),
            RejectReason::Other(s) => write!(f, "{s}"),
        }
    }
}
