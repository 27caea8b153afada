//! Core domain types and logic.

pub mod ohlcv;
pub mod market;
pub mod indicator;
pub mod rule;
pub mod rule_parser;
pub mod rule_eval;
pub mod rule_store;
pub mod backtest;
pub mod metrics;
pub mod config_validation;
pub mod error;
