pub mod manager;

pub use manager::{EntryLevels, RiskFileConfig, RiskManager, RiskParameters, HARD_POSITION_CEILING};
