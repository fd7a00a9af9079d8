pub mod atr;
pub mod ema;

pub use atr::{atr, true_range, true_range_series};
pub use ema::ema;

/// Last element of an indicator series, if it is a defined value.
///
/// Indicator series carry `NaN` for warm-up positions; those must never
/// feed a decision.
pub fn last_value(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_value_skips_undefined_tail() {
        assert_eq!(last_value(&[]), None);
        assert_eq!(last_value(&[1.0, f64::NAN]), None);
        assert_eq!(last_value(&[f64::NAN, 2.5]), Some(2.5));
    }
}
