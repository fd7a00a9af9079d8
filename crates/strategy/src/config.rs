use std::str::FromStr;

use serde::{Deserialize, Serialize};

use common::{Error, Result};

/// The two mutually exclusive detection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyVariant {
    Abcd,
    PriceAction,
}

impl StrategyVariant {
    /// Identifier used in logs and order comments.
    pub fn tag(&self) -> &'static str {
        match self {
            StrategyVariant::Abcd => "abcd",
            StrategyVariant::PriceAction => "price_action",
        }
    }
}

impl std::fmt::Display for StrategyVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for StrategyVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "abcd" | "1" => Ok(StrategyVariant::Abcd),
            "price_action" | "price-action" | "2" => Ok(StrategyVariant::PriceAction),
            other => Err(Error::Config(format!(
                "strategy variant must be 'abcd' or 'price_action', got '{other}'"
            ))),
        }
    }
}

/// Strategy parameters, fixed for the lifetime of a run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub variant: StrategyVariant,
    /// EMA period of the trend filter.
    pub ema_period: usize,
    /// ATR period used for risk sizing.
    pub atr_period: usize,
    /// Maximum deviation of the ABCD leg ratios from 0.618 / 1.618.
    pub abcd_tolerance: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            variant: StrategyVariant::Abcd,
            ema_period: 50,
            atr_period: 14,
            abcd_tolerance: 0.15,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ema_period == 0 {
            return Err(Error::Config("ema_period must be at least 1".into()));
        }
        if self.atr_period == 0 {
            return Err(Error::Config("atr_period must be at least 1".into()));
        }
        if self.abcd_tolerance.is_nan() || self.abcd_tolerance <= 0.0 {
            return Err(Error::Config(format!(
                "abcd_tolerance must be positive, got {}",
                self.abcd_tolerance
            )));
        }
        Ok(())
    }

    /// Replace the configured variant with `choice` (`abcd`, `price_action`,
    /// or the menu numbers `1`/`2`) when one is given.
    pub fn with_variant_override(mut self, choice: Option<&str>) -> Result<Self> {
        if let Some(choice) = choice {
            self.variant = choice.parse()?;
        }
        Ok(self)
    }
}

/// Strategy section of the settings file (TOML).
///
/// Example `config/strategy.toml`:
/// ```toml
/// [strategy]
/// variant = "abcd"
/// ema_period = 50
/// atr_period = 14
/// abcd_tolerance = 0.15
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(default)]
    pub strategy: StrategyConfig,
}

impl StrategyFileConfig {
    /// Load and validate from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read strategy config at '{path}': {e}"))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content)?;
        cfg.strategy.validate()?;
        Ok(cfg)
    }
}
