//! Bar builders shared by the unit tests.

use chrono::{Duration, TimeZone, Utc};
use common::Bar;

pub fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        open,
        high,
        low,
        close,
        volume: 100.0,
    }
}

pub fn closes(values: &[f64]) -> Vec<Bar> {
    values.iter().map(|&c| bar(c, c, c, c)).collect()
}

/// `n` doji bars at `level` (open = high = low = close).
pub fn flat(level: f64, n: usize) -> Vec<Bar> {
    closes(&vec![level; n])
}

/// Stamp consecutive 15-minute timestamps onto `bars`.
pub fn timestamped(mut bars: Vec<Bar>) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    for (i, b) in bars.iter_mut().enumerate() {
        b.timestamp = start + Duration::minutes(15 * i as i64);
    }
    bars
}
