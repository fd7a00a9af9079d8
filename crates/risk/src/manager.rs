use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use common::{Error, OpenPosition, PositionSide, Result};

/// Hard ceiling on simultaneous open positions. Not user-configurable;
/// `max_concurrent_trades` must not exceed it.
pub const HARD_POSITION_CEILING: usize = 10;

/// User-configurable risk parameters, all expressed as multiples.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParameters {
    /// Stop-loss distance from entry, in ATRs.
    pub stop_atr_multiple: f64,
    /// Take-profit distance from entry, in ATRs.
    pub take_profit_atr_multiple: f64,
    /// Favorable move, in units of initial risk, that arms the trailing stop.
    pub trail_trigger_multiple: f64,
    /// Share of initial risk locked in beyond entry once armed.
    pub trail_lock_fraction: f64,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            stop_atr_multiple: 2.0,
            take_profit_atr_multiple: 3.0,
            trail_trigger_multiple: 1.5,
            trail_lock_fraction: 0.5,
        }
    }
}

impl RiskParameters {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("stop_atr_multiple", self.stop_atr_multiple),
            ("take_profit_atr_multiple", self.take_profit_atr_multiple),
            ("trail_trigger_multiple", self.trail_trigger_multiple),
            ("trail_lock_fraction", self.trail_lock_fraction),
        ];
        for (name, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(Error::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if self.trail_lock_fraction >= self.trail_trigger_multiple {
            return Err(Error::Config(format!(
                "trail_lock_fraction ({}) must be below trail_trigger_multiple ({})",
                self.trail_lock_fraction, self.trail_trigger_multiple
            )));
        }
        Ok(())
    }
}

/// Risk section of the settings file (TOML).
///
/// ```toml
/// [risk]
/// stop_atr_multiple = 2.0
/// take_profit_atr_multiple = 3.0
/// trail_trigger_multiple = 1.5
/// trail_lock_fraction = 0.5
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RiskFileConfig {
    #[serde(default)]
    pub risk: RiskParameters,
}

impl RiskFileConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read risk config at '{path}': {e}"))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content)?;
        cfg.risk.validate()?;
        Ok(cfg)
    }
}

/// Protective levels for a new entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryLevels {
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Sizes protective levels for new entries, ratchets stops on open
/// positions and enforces the concurrent-position cap.
///
/// Holds no position state: every decision is computed from what the
/// execution gateway reports.
#[derive(Debug, Clone)]
pub struct RiskManager {
    params: RiskParameters,
    max_concurrent_trades: usize,
}

impl RiskManager {
    pub fn new(params: RiskParameters, max_concurrent_trades: usize) -> Result<Self> {
        params.validate()?;
        if max_concurrent_trades == 0 || max_concurrent_trades > HARD_POSITION_CEILING {
            return Err(Error::Config(format!(
                "max_concurrent_trades must be between 1 and {HARD_POSITION_CEILING}, got {max_concurrent_trades}"
            )));
        }
        Ok(Self {
            params,
            max_concurrent_trades,
        })
    }

    pub fn params(&self) -> &RiskParameters {
        &self.params
    }

    pub fn max_concurrent_trades(&self) -> usize {
        self.max_concurrent_trades
    }

    /// True while another position may be opened.
    pub fn has_capacity(&self, open_positions: usize) -> bool {
        open_positions < self.max_concurrent_trades
    }

    /// Stop-loss and take-profit for an entry at `price`, sized in ATRs.
    ///
    /// Fails with `IndeterminateRisk` when the ATR is undefined (warm-up) or
    /// not positive; the caller must skip the entry.
    pub fn entry_levels(
        &self,
        symbol: &str,
        side: PositionSide,
        price: f64,
        atr: f64,
    ) -> Result<EntryLevels> {
        if !atr.is_finite() || atr <= 0.0 || !price.is_finite() {
            return Err(Error::IndeterminateRisk {
                symbol: symbol.to_string(),
            });
        }

        let stop_distance = atr * self.params.stop_atr_multiple;
        let target_distance = atr * self.params.take_profit_atr_multiple;
        let levels = match side {
            PositionSide::Long => EntryLevels {
                stop_loss: price - stop_distance,
                take_profit: price + target_distance,
            },
            PositionSide::Short => EntryLevels {
                stop_loss: price + stop_distance,
                take_profit: price - target_distance,
            },
        };
        debug!(
            symbol = %symbol,
            side = %side,
            price = price,
            atr = atr,
            sl = levels.stop_loss,
            tp = levels.take_profit,
            "Entry levels computed"
        );
        Ok(levels)
    }

    /// Proposed tighter stop for `position` at `current_price`, if any.
    ///
    /// Initial risk is the distance from entry to the stop recorded at entry,
    /// or to the current stop when the gateway did not record one. Once price
    /// has moved `trail_trigger_multiple` risks in favor, the stop is moved to
    /// entry plus `trail_lock_fraction` risks. The stop only ever tightens.
    pub fn trailing_update(&self, position: &OpenPosition, current_price: f64) -> Option<f64> {
        if !current_price.is_finite() {
            return None;
        }
        let reference_stop = position.initial_stop_loss.unwrap_or(position.stop_loss);
        let entry = position.entry_price;

        let new_stop = match position.side {
            PositionSide::Long => {
                let initial_risk = entry - reference_stop;
                if initial_risk.is_nan() || initial_risk <= 0.0 {
                    return None;
                }
                if current_price <= entry + initial_risk * self.params.trail_trigger_multiple {
                    return None;
                }
                let proposed = entry + initial_risk * self.params.trail_lock_fraction;
                if proposed <= position.stop_loss {
                    return None;
                }
                proposed
            }
            PositionSide::Short => {
                let initial_risk = reference_stop - entry;
                if initial_risk.is_nan() || initial_risk <= 0.0 {
                    return None;
                }
                if current_price >= entry - initial_risk * self.params.trail_trigger_multiple {
                    return None;
                }
                let proposed = entry - initial_risk * self.params.trail_lock_fraction;
                // A zero stop means "no stop" on the gateway side.
                if position.stop_loss > 0.0 && proposed >= position.stop_loss {
                    return None;
                }
                proposed
            }
        };

        info!(
            symbol = %position.symbol,
            ticket = %position.id,
            side = %position.side,
            current_stop = position.stop_loss,
            new_stop = new_stop,
            price = current_price,
            "Trailing stop armed"
        );
        Some(new_stop)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> RiskManager {
        RiskManager::new(RiskParameters::default(), 2).unwrap()
    }

    fn make_position(
        side: PositionSide,
        entry_price: f64,
        stop_loss: f64,
        initial_stop_loss: Option<f64>,
    ) -> OpenPosition {
        OpenPosition {
            id: "1001".into(),
            symbol: "EURUSD".into(),
            side,
            entry_price,
            stop_loss,
            take_profit: 0.0,
            initial_stop_loss,
            volume: 0.1,
            opened_at: chrono::Utc::now(),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn long_entry_levels_use_atr_multiples() {
        let levels = manager()
            .entry_levels("EURUSD", PositionSide::Long, 1.1000, 0.0010)
            .unwrap();
        assert!(approx(levels.stop_loss, 1.0980));
        assert!(approx(levels.take_profit, 1.1030));
    }

    #[test]
    fn short_entry_levels_are_mirrored() {
        let levels = manager()
            .entry_levels("EURUSD", PositionSide::Short, 1.1000, 0.0010)
            .unwrap();
        assert!(approx(levels.stop_loss, 1.1020));
        assert!(approx(levels.take_profit, 1.0970));
    }

    #[test]
    fn undefined_atr_is_indeterminate() {
        for atr in [f64::NAN, 0.0, -0.001, f64::INFINITY] {
            let err = manager()
                .entry_levels("EURUSD", PositionSide::Long, 1.1, atr)
                .unwrap_err();
            assert!(
                matches!(err, Error::IndeterminateRisk { ref symbol } if symbol == "EURUSD"),
                "atr {atr} gave {err:?}"
            );
        }
    }

    #[test]
    fn long_trailing_stop_locks_half_the_risk() {
        // entry 1.1000, initial stop 1.0950 -> risk 0.0050, trigger above 1.1075
        let pos = make_position(PositionSide::Long, 1.1000, 1.0950, Some(1.0950));
        let new_stop = manager().trailing_update(&pos, 1.1080).expect("update");
        assert!(approx(new_stop, 1.1025), "got {new_stop}");
    }

    #[test]
    fn trailing_update_is_idempotent() {
        let risk = manager();
        let mut pos = make_position(PositionSide::Long, 1.1000, 1.0950, Some(1.0950));
        let new_stop = risk.trailing_update(&pos, 1.1080).unwrap();
        pos.stop_loss = new_stop;
        assert_eq!(risk.trailing_update(&pos, 1.1080), None);

        // Without a recorded initial stop the derived risk is no longer positive.
        pos.initial_stop_loss = None;
        assert_eq!(risk.trailing_update(&pos, 1.1080), None);
    }

    #[test]
    fn no_update_below_trigger() {
        let pos = make_position(PositionSide::Long, 1.1000, 1.0950, Some(1.0950));
        assert_eq!(manager().trailing_update(&pos, 1.1074), None);
        assert_eq!(manager().trailing_update(&pos, 1.0900), None);
    }

    #[test]
    fn initial_risk_falls_back_to_current_stop() {
        let pos = make_position(PositionSide::Long, 1.1000, 1.0950, None);
        let new_stop = manager().trailing_update(&pos, 1.1080).unwrap();
        assert!(approx(new_stop, 1.1025));
    }

    #[test]
    fn never_loosens_an_already_tighter_stop() {
        // Stop was moved manually beyond the lock level.
        let pos = make_position(PositionSide::Long, 1.1000, 1.1040, Some(1.0950));
        assert_eq!(manager().trailing_update(&pos, 1.1200), None);
    }

    #[test]
    fn short_trailing_stop_is_mirrored() {
        // entry 1.1000, initial stop 1.1050 -> risk 0.0050, trigger below 1.0925
        let risk = manager();
        let mut pos = make_position(PositionSide::Short, 1.1000, 1.1050, Some(1.1050));
        assert_eq!(risk.trailing_update(&pos, 1.0930), None);

        let new_stop = risk.trailing_update(&pos, 1.0920).expect("update");
        assert!(approx(new_stop, 1.0975), "got {new_stop}");

        pos.stop_loss = new_stop;
        assert_eq!(risk.trailing_update(&pos, 1.0920), None);
    }

    #[test]
    fn capacity_is_capped() {
        let risk = manager();
        assert!(risk.has_capacity(0));
        assert!(risk.has_capacity(1));
        assert!(!risk.has_capacity(2));
        assert!(!risk.has_capacity(3));
    }

    #[test]
    fn hard_ceiling_rejects_large_caps() {
        assert!(RiskManager::new(RiskParameters::default(), HARD_POSITION_CEILING).is_ok());
        assert!(RiskManager::new(RiskParameters::default(), HARD_POSITION_CEILING + 1).is_err());
        assert!(RiskManager::new(RiskParameters::default(), 0).is_err());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let params = RiskParameters {
            trail_lock_fraction: 2.0,
            ..RiskParameters::default()
        };
        assert!(RiskManager::new(params, 2).is_err());

        let params = RiskParameters {
            stop_atr_multiple: 0.0,
            ..RiskParameters::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn risk_section_parses_from_toml() {
        let cfg = RiskFileConfig::from_toml_str(
            r#"
            [strategy]
            variant = "abcd"

            [risk]
            stop_atr_multiple = 1.5
            "#,
        )
        .unwrap();
        assert!(approx(cfg.risk.stop_atr_multiple, 1.5));
        assert!(approx(cfg.risk.take_profit_atr_multiple, 3.0));
    }
}
