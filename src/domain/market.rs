//! Supported markets for the price source.

use crate::domain::error::BacktestError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    /// Taiwan Stock Exchange (listed).
    Twse,
    /// Taipei Exchange (OTC).
    Tpex,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Twse => "TWSE",
            Market::Tpex => "TPEX",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TWSE" => Ok(Market::Twse),
            "TPEX" => Ok(Market::Tpex),
            other => Err(BacktestError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "market".to_string(),
                reason: format!("market must be TWSE or TPEX, got '{}'", other),
            }),
        }
    }
}

/// Security class, which decides the round-trip transaction cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StockType {
    #[default]
    Stock,
    Etf,
}

/// Broker fee charged on each side of a trade.
const BROKER_FEE: f64 = 0.00285;

impl StockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockType::Stock => "stock",
            StockType::Etf => "etf",
        }
    }

    /// Transaction tax plus broker fee, as a fraction of the entry price.
    pub fn tax_rate(&self) -> f64 {
        match self {
            StockType::Stock => 0.003 + BROKER_FEE,
            StockType::Etf => 0.001 + BROKER_FEE,
        }
    }
}

impl fmt::Display for StockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockType {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stock" => Ok(StockType::Stock),
            "etf" => Ok(StockType::Etf),
            other => Err(BacktestError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "stock_type".to_string(),
                reason: format!("stock_type must be stock or etf, got '{}'", other),
            }),
        }
    }
}
