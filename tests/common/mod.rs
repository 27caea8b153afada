#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use twbacktest::domain::backtest::BacktestConfig;
use twbacktest::domain::error::BacktestError;
use twbacktest::domain::market::{Market, StockType};
pub use twbacktest::domain::ohlcv::DailyBar;
use twbacktest::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<DailyBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<DailyBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_daily(
        &self,
        _market: Market,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, BacktestError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(BacktestError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn date_range(
        &self,
        _market: Market,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, BacktestError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(BacktestError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .and_then(|bars| Some((bars.first()?.date, bars.last()?.date))))
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Consecutive daily bars from 2024-01-01, opening at the previous close.
pub fn make_bars(closes: &[f64]) -> Vec<DailyBar> {
    let start = date("2024-01-01");
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            DailyBar {
                date: start + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 10_000,
            }
        })
        .collect()
}

/// 15 falling closes followed by 15 rising ones: MA5 dips under MA20 and
/// then crosses back above it.
pub fn v_shaped_closes() -> Vec<f64> {
    let falling = (0..15).map(|i| 120.0 - 2.0 * i as f64);
    let rising = (0..15).map(|i| 92.0 + 3.0 * i as f64);
    falling.chain(rising).collect()
}

pub fn make_config(code: &str) -> BacktestConfig {
    BacktestConfig {
        market: Market::Twse,
        code: code.to_string(),
        start_date: date("2024-01-01"),
        end_date: date("2024-12-31"),
        shares: 1000,
        stock_type: StockType::Stock,
        risk_free_rate: 0.015,
        data_dir: PathBuf::from("data"),
    }
}
