use thiserror::Error;

use crate::RejectReason;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No bars available for {symbol}")]
    DataUnavailable { symbol: String },

    #[error("ATR not available for {symbol}; risk levels are indeterminate")]
    IndeterminateRisk { symbol: String },

    #[error("Order rejected: {reason}")]
    OrderRejected { reason: RejectReason },

    #[error("Terminal connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The gateway's reject reason, if this error is a rejection.
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            Error::OrderRejected { reason } => Some(reason),
            _ => None,
        }
    }
}

impl From<RejectReason> for Error {
    fn from(reason: RejectReason) -> Self {
        Error::OrderRejected { reason }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
