/// Exponential Moving Average of closes, aligned with `bars`.
///
/// k = 2/(period+1), seeded at the first close, then
/// EMA[t] = close[t]*k + EMA[t-1]*(1-k). Positions before `period - 1`
/// are reported as `NaN` so warm-up values never drive a decision.
pub fn ema(bars: &[common::Bar], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; bars.len()];
    if period == 0 || bars.is_empty() {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut value = bars[0].close;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            value = bar.close * k + value * (1.0 - k);
        }
        if i + 1 >= period {
            out[i] = value;
        }
    }
    out
}
