//! Price-action detector: inside-bar breakouts, engulfing candles and pin bars.
//!
//! Rules are evaluated in a fixed priority order and the first one that
//! agrees with the EMA trend wins:
//! breakout > engulfing > pin bar, bullish before bearish at each level.

use tracing::info;

use common::{Bar, Signal};

use crate::{trend, Detection, Pattern, PatternDetector, StrategyConfig, Trend};

pub const MIN_BARS: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct PriceActionDetector;

/// Candle patterns present on the latest bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Candles {
    pub breakout_up: bool,
    pub breakout_down: bool,
    pub bullish_engulfing: bool,
    pub bearish_engulfing: bool,
    pub bullish_pin: bool,
    pub bearish_pin: bool,
}

impl Candles {
    /// Classify `current` against the two bars before it.
    ///
    /// The inside bar is `prev`, contained in `mother`; a breakout is a close
    /// of `current` beyond the inside bar's range.
    pub fn classify(mother: &Bar, prev: &Bar, current: &Bar) -> Self {
        let inside = prev.high < mother.high && prev.low > mother.low;

        Self {
            breakout_up: inside && current.close > prev.high,
            breakout_down: inside && current.close < prev.low,
            bullish_engulfing: prev.is_bearish()
                && current.is_bullish()
                && current.open < prev.close
                && current.close > prev.open,
            bearish_engulfing: prev.is_bullish()
                && current.is_bearish()
                && current.open > prev.close
                && current.close < prev.open,
            bullish_pin: current.is_bullish()
                && (current.open - current.low) > 2.0 * (current.high - current.close),
            bearish_pin: current.is_bearish()
                && (current.high - current.open) > 2.0 * (current.close - current.low),
        }
    }

    /// Apply the priority ladder under `trend`.
    pub fn resolve(&self, trend: Trend) -> Option<Detection> {
        let up = trend == Trend::Up;
        let down = trend == Trend::Down;
        let ladder = [
            (self.breakout_up && up, Signal::Buy, Pattern::InsideBarBreakout),
            (self.breakout_down && down, Signal::Sell, Pattern::InsideBarBreakout),
            (self.bullish_engulfing && up, Signal::Buy, Pattern::Engulfing),
            (self.bearish_engulfing && down, Signal::Sell, Pattern::Engulfing),
            (self.bullish_pin && up, Signal::Buy, Pattern::PinBar),
            (self.bearish_pin && down, Signal::Sell, Pattern::PinBar),
        ];
        ladder
            .into_iter()
            .find(|(hit, _, _)| *hit)
            .map(|(_, signal, pattern)| Detection { signal, pattern })
    }
}

impl PatternDetector for PriceActionDetector {
    fn name(&self) -> &'static str {
        "price_action"
    }

    fn min_bars(&self) -> usize {
        MIN_BARS
    }

    fn detect(&self, bars: &[Bar], cfg: &StrategyConfig) -> Option<Detection> {
        if bars.len() < MIN_BARS {
            return None;
        }
        let trend = trend(bars, cfg.ema_period)?;
        let n = bars.len();
        let candles = Candles::classify(&bars[n - 3], &bars[n - 2], &bars[n - 1]);

        let detection = candles.resolve(trend)?;
        info!(
            trend = %trend,
            pattern = %detection.pattern,
            signal = %detection.signal,
            "Price action signal detected"
        );
        Some(detection)
    }
}
