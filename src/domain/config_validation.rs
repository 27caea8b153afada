//! Configuration validation.
//!
//! Validates every `[backtest]` field and every rule section before a run,
//! then builds the typed [`BacktestConfig`] and rule groups from them.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::BacktestError;
use crate::domain::market::{Market, StockType};
use crate::domain::metrics::DEFAULT_RISK_FREE_RATE;
use crate::domain::rule::{RuleGroup, RuleType};
use crate::domain::rule_parser::parse_group;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

const SECTION: &str = "backtest";
const CONDITIONS_KEY: &str = "conditions";

pub const DEFAULT_SHARES: u32 = 1000;
pub const DEFAULT_DATA_DIR: &str = "data";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_market(config)?;
    validate_code(config)?;
    validate_dates(config)?;
    validate_shares(config)?;
    validate_stock_type(config)?;
    validate_risk_free_rate(config)?;
    validate_rule_sections(config)?;
    Ok(())
}

/// Validate, then build the typed run configuration.
pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, BacktestError> {
    validate_backtest_config(config)?;

    let shares = config.get_int(SECTION, "shares", i64::from(DEFAULT_SHARES));
    Ok(BacktestConfig {
        market: parse_market(config)?,
        code: required(config, "code")?,
        start_date: parse_date(config, "start_date")?,
        end_date: parse_date(config, "end_date")?,
        shares: u32::try_from(shares).map_err(|_| invalid("shares", "shares out of range"))?,
        stock_type: parse_stock_type(config)?,
        risk_free_rate: config.get_double(SECTION, "risk_free_rate", DEFAULT_RISK_FREE_RATE),
        data_dir: config
            .get_string(SECTION, "data_dir")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
    })
}

/// Parse every `[entry.<name>]` and `[exit.<name>]` section into a rule
/// group, in section-name order. Groups carry no ids yet.
pub fn load_rule_groups(config: &dyn ConfigPort) -> Result<Vec<RuleGroup>, BacktestError> {
    let mut groups = Vec::new();
    for section in config.sections() {
        let Some((rule_type, name)) = rule_section(&section) else {
            continue;
        };
        if name.trim().is_empty() {
            return Err(BacktestError::ConfigInvalid {
                section: section.clone(),
                key: CONDITIONS_KEY.to_string(),
                reason: "rule section needs a name, e.g. [entry.golden_cross]".to_string(),
            });
        }

        let text = match config.get_string(&section, CONDITIONS_KEY) {
            Some(s) if !s.trim().is_empty() => s,
            _ => {
                return Err(BacktestError::ConfigMissing {
                    section: section.clone(),
                    key: CONDITIONS_KEY.to_string(),
                })
            }
        };

        let group = parse_group(name, rule_type, &text).map_err(|err| BacktestError::ConfigInvalid {
            section: section.clone(),
            key: CONDITIONS_KEY.to_string(),
            reason: format!("\n{}", err.display_with_context(&text)),
        })?;
        groups.push(group);
    }
    Ok(groups)
}

fn rule_section(section: &str) -> Option<(RuleType, &str)> {
    let (prefix, name) = section.split_once('.')?;
    let rule_type = RuleType::from_str(prefix).ok()?;
    Some((rule_type, name))
}

fn invalid(key: &str, reason: impl Into<String>) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: SECTION.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn required(config: &dyn ConfigPort, key: &str) -> Result<String, BacktestError> {
    match config.get_string(SECTION, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(BacktestError::ConfigMissing {
            section: SECTION.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Parse an optional numeric key; absent keys yield `None`, malformed ones
/// are rejected rather than silently defaulted.
fn optional_number<T: FromStr>(config: &dyn ConfigPort, key: &str) -> Result<Option<T>, BacktestError> {
    match config.get_string(SECTION, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(key, format!("'{}' is not a number", raw.trim()))),
    }
}

fn parse_market(config: &dyn ConfigPort) -> Result<Market, BacktestError> {
    match config.get_string(SECTION, "market") {
        Some(s) if !s.trim().is_empty() => s.parse(),
        _ => Ok(Market::Twse),
    }
}

fn parse_stock_type(config: &dyn ConfigPort) -> Result<StockType, BacktestError> {
    match config.get_string(SECTION, "stock_type") {
        Some(s) if !s.trim().is_empty() => s.parse(),
        _ => Ok(StockType::default()),
    }
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, BacktestError> {
    let value = required(config, key)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|_| invalid(key, format!("invalid {} format, expected YYYY-MM-DD", key)))
}

fn validate_market(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    parse_market(config).map(|_| ())
}

fn validate_code(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    required(config, "code").map(|_| ())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date > end_date {
        return Err(invalid("start_date", "start_date must not be after end_date"));
    }
    Ok(())
}

fn validate_shares(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let shares: i64 = optional_number(config, "shares")?.unwrap_or(i64::from(DEFAULT_SHARES));
    if shares <= 0 || shares > i64::from(u32::MAX) {
        return Err(invalid("shares", "shares must be a positive whole number"));
    }
    Ok(())
}

fn validate_stock_type(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    parse_stock_type(config).map(|_| ())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value: f64 = optional_number(config, "risk_free_rate")?.unwrap_or(DEFAULT_RISK_FREE_RATE);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid("risk_free_rate", "risk_free_rate must be between 0 and 1"));
    }
    Ok(())
}

fn validate_rule_sections(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let groups = load_rule_groups(config)?;
    for (rule_type, placeholder) in [(RuleType::Entry, "entry.<name>"), (RuleType::Exit, "exit.<name>")] {
        if !groups.iter().any(|g| g.rule_type == rule_type) {
            return Err(BacktestError::ConfigMissing {
                section: placeholder.to_string(),
                key: CONDITIONS_KEY.to_string(),
            });
        }
    }
    Ok(())
}
