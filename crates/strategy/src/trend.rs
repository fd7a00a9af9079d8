use common::Bar;

use crate::indicators::{ema, last_value};

/// Direction of the EMA trend filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Up => write!(f, "up"),
            Trend::Down => write!(f, "down"),
        }
    }
}

/// `Up` when the last close is above EMA(`ema_period`), otherwise `Down`.
/// Returns `None` while the EMA is still warming up.
pub fn trend(bars: &[Bar], ema_period: usize) -> Option<Trend> {
    let last_close = bars.last()?.close;
    let last_ema = last_value(&ema(bars, ema_period))?;
    if last_close > last_ema {
        Some(Trend::Up)
    } else {
        Some(Trend::Down)
    }
}
