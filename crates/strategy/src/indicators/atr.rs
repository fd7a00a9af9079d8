//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), with the
//! first bar falling back to high-low. ATR is the simple rolling mean of the
//! last `period` true ranges (no Wilder smoothing).

use common::Bar;

/// True range of `bar` given the previous bar's close, if any.
pub fn true_range(bar: &Bar, previous_close: Option<f64>) -> f64 {
    let range = bar.high - bar.low;
    match previous_close {
        Some(pc) => range.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
        None => range,
    }
}

/// True range for every bar, aligned with `bars`.
pub fn true_range_series(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let previous_close = i.checked_sub(1).map(|p| bars[p].close);
            true_range(bar, previous_close)
        })
        .collect()
}

/// ATR aligned with `bars`. The first `period - 1` positions are `NaN`.
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    if period == 0 || bars.len() < period {
        return out;
    }

    let tr = true_range_series(bars);
    for i in (period - 1)..bars.len() {
        let window = &tr[i + 1 - period..=i];
        out[i] = window.iter().sum::<f64>() / period as f64;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_bars::bar;

    #[test]
    fn first_bar_uses_high_low_range() {
        let b = bar(1.10, 1.12, 1.09, 1.11);
        assert!((true_range(&b, None) - 0.03).abs() < 1e-12);
    }

    #[test]
    fn gap_extends_true_range() {
        // Gap up: previous close far below today's low
        let b = bar(1.20, 1.21, 1.19, 1.20);
        let tr = true_range(&b, Some(1.10));
        assert!((tr - 0.11).abs() < 1e-12, "got {tr}");

        // Gap down: previous close far above today's high
        let tr = true_range(&b, Some(1.30));
        assert!((tr - 0.11).abs() < 1e-12, "got {tr}");
    }

    #[test]
    fn atr_warmup_is_undefined() {
        let bars: Vec<Bar> = (0..5).map(|_| bar(1.0, 1.5, 0.5, 1.0)).collect();
        let series = atr(&bars, 3);
        assert_eq!(series.len(), 5);
        assert!(series[0].is_nan());
        assert!(series[1].is_nan());
        assert!((series[2] - 1.0).abs() < 1e-12);
        assert!((series[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn atr_is_simple_rolling_mean() {
        let bars = vec![
            bar(10.0, 11.0, 9.0, 10.0),  // TR 2
            bar(10.0, 12.0, 10.0, 11.0), // TR 2
            bar(11.0, 15.0, 11.0, 14.0), // TR 4
            bar(14.0, 14.0, 13.0, 13.0), // TR 1
        ];
        let series = atr(&bars, 2);
        assert!(series[0].is_nan());
        assert!((series[1] - 2.0).abs() < 1e-12);
        assert!((series[2] - 3.0).abs() < 1e-12);
        assert!((series[3] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn atr_with_short_series_is_all_nan() {
        let bars: Vec<Bar> = (0..3).map(|_| bar(1.0, 1.1, 0.9, 1.0)).collect();
        assert!(atr(&bars, 14).iter().all(|v| v.is_nan()));
        assert!(atr(&bars, 0).iter().all(|v| v.is_nan()));
    }
}
