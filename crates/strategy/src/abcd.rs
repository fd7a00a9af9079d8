//! Harmonic ABCD pattern detector.
//!
//! Scans the last `WINDOW` bars for three consecutive swing candidates A, B, C
//! and measures them against D, the extreme of the latest bar. The BC leg must
//! retrace AB by roughly 0.618 and CD must extend BC by roughly 1.618. The
//! first candidate (lowest index) that fits wins.

use tracing::info;

use common::{Bar, Signal};

use crate::{trend, Detection, Pattern, PatternDetector, StrategyConfig, Trend};

/// Bars scanned for swing points; also the minimum series length.
pub const WINDOW: usize = 30;

pub const BC_RETRACEMENT: f64 = 0.618;
pub const CD_EXTENSION: f64 = 1.618;

#[derive(Debug, Clone, Copy, Default)]
pub struct AbcdDetector;

/// Leg lengths of a candidate, all measured as positive distances.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Legs {
    ab: f64,
    bc: f64,
    cd: f64,
}

impl Legs {
    fn fits(&self, tolerance: f64) -> bool {
        self.ab > 0.0
            && self.bc > 0.0
            && self.cd > 0.0
            && (self.bc / self.ab - BC_RETRACEMENT).abs() < tolerance
            && (self.cd / self.bc - CD_EXTENSION).abs() < tolerance
    }
}

/// A=low[i], B=high[i+1], C=low[i+2], D=low of the last bar.
fn bullish_legs(window: &[Bar], i: usize) -> Legs {
    let a = window[i].low;
    let b = window[i + 1].high;
    let c = window[i + 2].low;
    let d = window[window.len() - 1].low;
    Legs { ab: b - a, bc: b - c, cd: d - c }
}

/// A=high[i], B=low[i+1], C=high[i+2], D=high of the last bar.
fn bearish_legs(window: &[Bar], i: usize) -> Legs {
    let a = window[i].high;
    let b = window[i + 1].low;
    let c = window[i + 2].high;
    let d = window[window.len() - 1].high;
    Legs { ab: a - b, bc: c - b, cd: c - d }
}

impl AbcdDetector {
    /// Scan `window` in ascending order and return the first candidate that
    /// fits the hypothesis allowed by `trend`.
    fn scan(window: &[Bar], trend: Trend, tolerance: f64) -> Option<Detection> {
        // C must precede the bar that supplies D.
        let last_start = window.len().checked_sub(3)?;
        for i in 0..last_start {
            let (legs, signal) = match trend {
                Trend::Up => (bullish_legs(window, i), Signal::Buy),
                Trend::Down => (bearish_legs(window, i), Signal::Sell),
            };
            if legs.fits(tolerance) {
                return Some(Detection {
                    signal,
                    pattern: Pattern::Abcd {
                        index: i,
                        ab: legs.ab,
                        bc: legs.bc,
                        cd: legs.cd,
                    },
                });
            }
        }
        None
    }
}

impl PatternDetector for AbcdDetector {
    fn name(&self) -> &'static str {
        "abcd"
    }

    fn min_bars(&self) -> usize {
        WINDOW
    }

    fn detect(&self, bars: &[Bar], cfg: &StrategyConfig) -> Option<Detection> {
        if bars.len() < WINDOW {
            return None;
        }
        let trend = trend(bars, cfg.ema_period)?;
        let window = &bars[bars.len() - WINDOW..];

        let detection = Self::scan(window, trend, cfg.abcd_tolerance)?;
        if let Pattern::Abcd { ab, bc, cd, .. } = detection.pattern {
            let direction = if detection.signal == Signal::Buy { "Bullish" } else { "Bearish" };
            info!(
                trend = %trend,
                "{direction} ABCD pattern detected (AB={ab:.5}, BC={bc:.5}, CD={cd:.5})"
            );
        }
        Some(detection)
    }
}
