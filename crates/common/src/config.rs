use std::time::Duration;

use crate::{Error, Result, Timeframe};

/// Run configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Trading
    /// Symbols evaluated each cycle, in this order.
    pub watchlist: Vec<String>,
    pub timeframe: Timeframe,
    pub max_concurrent_trades: usize,
    pub lot_size: f64,
    pub order_deviation_points: u32,
    pub magic_number: u64,

    // Cadence
    pub cycle_interval: Duration,
    /// Bars fetched per symbol per cycle.
    pub bar_count: usize,

    // Strategy config file path
    pub strategy_config_path: String,
    /// `STRATEGY` value that replaces the variant named in the settings file.
    pub strategy_override: Option<String>,

    // Paper terminal
    pub paper_data_dir: Option<String>,
    pub paper_slippage_bps: f64,
    pub paper_spread: f64,
}

impl Config {
    /// Load configuration from the process environment.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let watchlist: Vec<String> = required(&lookup, "WATCHLIST")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if watchlist.is_empty() {
            return Err(Error::Config("WATCHLIST must name at least one symbol".into()));
        }

        let timeframe = match lookup("TIMEFRAME") {
            Some(v) => v.parse()?,
            None => Timeframe::default(),
        };

        let max_concurrent_trades: usize = parsed(&lookup, "MAX_CONCURRENT_TRADES", 2)?;
        if max_concurrent_trades == 0 {
            return Err(Error::Config("MAX_CONCURRENT_TRADES must be at least 1".into()));
        }

        let lot_size: f64 = parsed(&lookup, "LOT_SIZE", 0.1)?;
        if lot_size.is_nan() || lot_size <= 0.0 {
            return Err(Error::Config(format!("LOT_SIZE must be positive, got {lot_size}")));
        }

        let bar_count: usize = parsed(&lookup, "BAR_COUNT", 100)?;
        if bar_count == 0 {
            return Err(Error::Config("BAR_COUNT must be at least 1".into()));
        }

        Ok(Config {
            watchlist,
            timeframe,
            max_concurrent_trades,
            lot_size,
            order_deviation_points: parsed(&lookup, "ORDER_DEVIATION_POINTS", 10)?,
            magic_number: parsed(&lookup, "MAGIC_NUMBER", 123_456)?,
            cycle_interval: Duration::from_secs(parsed(&lookup, "CYCLE_INTERVAL_SECS", 60)?),
            bar_count,
            strategy_config_path: lookup("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategy.toml".to_string()),
            strategy_override: lookup("STRATEGY").filter(|s| !s.trim().is_empty()),
            paper_data_dir: lookup("PAPER_DATA_DIR"),
            paper_slippage_bps: parsed(&lookup, "PAPER_SLIPPAGE_BPS", 0.0)?,
            paper_spread: parsed(&lookup, "PAPER_SPREAD", 0.0)?,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| {
        Error::Config(format!(
            "Required environment variable '{key}' is not set. Check your .env file."
        ))
    })
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
        None => Ok(default),
    }
}
