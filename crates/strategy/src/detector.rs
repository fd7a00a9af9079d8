use tracing::info;

use common::Bar;

use crate::{
    AbcdDetector, Detection, PatternDetector, PriceActionDetector, StrategyConfig,
    StrategyVariant,
};

/// The detector chosen at startup. Dispatch is a `match`, resolved once per
/// run by [`Detector::from_config`].
#[derive(Debug, Clone, Copy)]
pub enum Detector {
    Abcd(AbcdDetector),
    PriceAction(PriceActionDetector),
}

impl Detector {
    pub fn new(variant: StrategyVariant) -> Self {
        match variant {
            StrategyVariant::Abcd => Detector::Abcd(AbcdDetector),
            StrategyVariant::PriceAction => Detector::PriceAction(PriceActionDetector),
        }
    }

    pub fn from_config(cfg: &StrategyConfig) -> Self {
        let detector = Self::new(cfg.variant);
        info!(
            strategy = %detector.name(),
            ema_period = cfg.ema_period,
            atr_period = cfg.atr_period,
            "Registered pattern detector"
        );
        detector
    }

    pub fn variant(&self) -> StrategyVariant {
        match self {
            Detector::Abcd(_) => StrategyVariant::Abcd,
            Detector::PriceAction(_) => StrategyVariant::PriceAction,
        }
    }
}

impl PatternDetector for Detector {
    fn name(&self) -> &'static str {
        match self {
            Detector::Abcd(d) => d.name(),
            Detector::PriceAction(d) => d.name(),
        }
    }

    fn min_bars(&self) -> usize {
        match self {
            Detector::Abcd(d) => d.min_bars(),
            Detector::PriceAction(d) => d.min_bars(),
        }
    }

    fn detect(&self, bars: &[Bar], cfg: &StrategyConfig) -> Option<Detection> {
        match self {
            Detector::Abcd(d) => d.detect(bars, cfg),
            Detector::PriceAction(d) => d.detect(bars, cfg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_selects_detector() {
        let abcd = Detector::new(StrategyVariant::Abcd);
        assert_eq!(abcd.name(), "abcd");
        assert_eq!(abcd.min_bars(), 30);
        assert_eq!(abcd.variant(), StrategyVariant::Abcd);

        let pa = Detector::from_config(&StrategyConfig {
            variant: StrategyVariant::PriceAction,
            ..StrategyConfig::default()
        });
        assert_eq!(pa.name(), "price_action");
        assert_eq!(pa.min_bars(), 5);
    }

    #[test]
    fn names_match_variant_tags() {
        for variant in [StrategyVariant::Abcd, StrategyVariant::PriceAction] {
            assert_eq!(Detector::new(variant).name(), variant.tag());
        }
    }
}
