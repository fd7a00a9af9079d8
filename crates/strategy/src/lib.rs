pub mod abcd;
pub mod config;
pub mod detector;
pub mod indicators;
pub mod price_action;
pub mod trend;

#[cfg(test)]
pub(crate) mod test_bars;

pub use abcd::AbcdDetector;
pub use config::{StrategyConfig, StrategyFileConfig, StrategyVariant};
pub use detector::Detector;
pub use price_action::PriceActionDetector;
pub use trend::{trend, Trend};

use common::{Bar, Signal};

/// Which chart pattern produced a signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pattern {
    /// Harmonic ABCD; `index` is the position of point A inside the scan window.
    Abcd { index: usize, ab: f64, bc: f64, cd: f64 },
    InsideBarBreakout,
    Engulfing,
    PinBar,
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Abcd { .. } => write!(f, "ABCD"),
            Pattern::InsideBarBreakout => write!(f, "inside-bar breakout"),
            Pattern::Engulfing => write!(f, "engulfing"),
            Pattern::PinBar => write!(f, "pin bar"),
        }
    }
}

/// A directional signal together with the pattern that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub signal: Signal,
    pub pattern: Pattern,
}

/// All pattern detectors must satisfy this trait.
pub trait PatternDetector: Send + Sync {
    /// Short identifier, also used as the order comment prefix.
    fn name(&self) -> &'static str;

    /// Fewer bars than this always yields no signal.
    fn min_bars(&self) -> usize;

    /// Evaluate a bar series (oldest first) and optionally emit a detection.
    fn detect(&self, bars: &[Bar], cfg: &StrategyConfig) -> Option<Detection>;

    /// Same as [`detect`](Self::detect), keeping only the direction.
    fn evaluate(&self, bars: &[Bar], cfg: &StrategyConfig) -> Option<Signal> {
        self.detect(bars, cfg).map(|d| d.signal)
    }
}
