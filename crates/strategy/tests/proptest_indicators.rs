use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use common::{Bar, Signal};
use strategy::indicators::{atr, ema};
use strategy::{trend, AbcdDetector, PatternDetector, PriceActionDetector, StrategyConfig, Trend};

fn bar_strategy() -> impl Strategy<Value = Bar> {
    (0.5f64..2.0, 0.0f64..0.05, 0.0f64..0.05, 0.0f64..1.0).prop_map(
        |(open, up, down, close_frac)| {
            let high = open + up;
            let low = open - down;
            Bar {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                open,
                high,
                low,
                close: low + (high - low) * close_frac,
                volume: 1.0,
            }
        },
    )
}

proptest! {
    /// Warm-up positions are undefined; everything after is a finite value.
    #[test]
    fn indicator_prefix_is_undefined(
        bars in prop::collection::vec(bar_strategy(), 1..80),
        period in 1usize..30,
    ) {
        for series in [atr(&bars, period), ema(&bars, period)] {
            prop_assert_eq!(series.len(), bars.len());
            for (i, v) in series.iter().enumerate() {
                if i + 1 < period {
                    prop_assert!(v.is_nan(), "index {} should be undefined", i);
                } else {
                    prop_assert!(v.is_finite(), "index {} should be defined", i);
                }
            }
        }
    }

    /// ATR is never negative once defined.
    #[test]
    fn atr_is_non_negative(bars in prop::collection::vec(bar_strategy(), 14..60)) {
        for v in atr(&bars, 14).into_iter().filter(|v| v.is_finite()) {
            prop_assert!(v >= 0.0);
        }
    }

    /// Trend gating is absolute for both detectors.
    #[test]
    fn signals_agree_with_trend(bars in prop::collection::vec(bar_strategy(), 30..120)) {
        let cfg = StrategyConfig { ema_period: 20, abcd_tolerance: 0.5, ..StrategyConfig::default() };
        let t = trend(&bars, cfg.ema_period);

        for signal in [AbcdDetector.evaluate(&bars, &cfg), PriceActionDetector.evaluate(&bars, &cfg)]
            .into_iter()
            .flatten()
        {
            match signal {
                Signal::Buy => prop_assert_eq!(t, Some(Trend::Up)),
                Signal::Sell => prop_assert_eq!(t, Some(Trend::Down)),
            }
        }
    }
}
