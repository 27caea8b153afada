//! Backtest simulator.
//!
//! A single long-only position of fixed share count. Signals observed at the
//! close of bar `i` fill at the open of bar `i + 1`; a position still open
//! after the last bar is closed at that bar's close.

use super::indicator::{
    build_indicator_series, IndicatorSeries, BOLLINGER_FAMILY, CLOSE, CONSTANT_LINES, KD_FAMILY,
    MACD_FAMILY,
};
use super::market::{Market, StockType};
use super::metrics::{compute_performance, net_return_pct, zero_indicators, PerformanceIndicator};
use super::ohlcv::DailyBar;
use super::rule::RuleGroup;
use super::rule_eval::generate_signals;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub market: Market,
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub shares: u32,
    pub stock_type: StockType,
    pub risk_free_rate: f64,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub entry_index: usize,
    pub exit_index: usize,
    /// `YYYY-MM-DD`
    pub entry_date: String,
    /// `YYYY-MM-DD`
    pub exit_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub indicators: Vec<PerformanceIndicator>,
    pub trades: Vec<Trade>,
    /// Per-trade return in percent after tax and fees, aligned with `trades`.
    pub net_returns: Vec<Option<f64>>,
    pub indicator_series: IndicatorSeries,
}

impl BacktestResult {
    /// Zero indicators, no trades, no series.
    pub fn empty() -> Self {
        Self {
            indicators: zero_indicators(),
            trades: Vec::new(),
            net_returns: Vec::new(),
            indicator_series: IndicatorSeries::new(),
        }
    }
}

enum PositionState {
    Flat,
    Long { entry_price: f64, entry_index: usize },
}

/// Walk the bars with a flat/long state machine and record closed trades.
///
/// Entry signals while long and exit signals while flat are ignored. Signal
/// slices shorter than `bars` read as `false` past their end.
pub fn simulate_trades(bars: &[DailyBar], entry: &[bool], exit: &[bool], shares: u32) -> Vec<Trade> {
    let n = bars.len();
    let shares = f64::from(shares);
    let signal = |flags: &[bool], i: usize| flags.get(i).copied().unwrap_or(false);

    let close_trade = |entry_price: f64, entry_index: usize, exit_price: f64, exit_index: usize| Trade {
        entry_price,
        exit_price,
        pnl: (exit_price - entry_price) * shares,
        entry_index,
        exit_index,
        entry_date: bars[entry_index].date_string(),
        exit_date: bars[exit_index].date_string(),
    };

    let mut trades = Vec::new();
    let mut state = PositionState::Flat;

    for i in 0..n.saturating_sub(1) {
        let next = &bars[i + 1];
        state = match state {
            PositionState::Flat if signal(entry, i) => {
                debug!(date = %next.date, price = next.open, "enter long");
                PositionState::Long {
                    entry_price: next.open,
                    entry_index: i + 1,
                }
            }
            PositionState::Long {
                entry_price,
                entry_index,
            } if signal(exit, i) => {
                debug!(date = %next.date, price = next.open, "exit long");
                trades.push(close_trade(entry_price, entry_index, next.open, i + 1));
                PositionState::Flat
            }
            unchanged => unchanged,
        };
    }

    if let (
        PositionState::Long {
            entry_price,
            entry_index,
        },
        Some(last),
    ) = (state, bars.last())
    {
        debug!(date = %last.date, price = last.close, "force close at end of data");
        trades.push(close_trade(entry_price, entry_index, last.close, n - 1));
    }

    trades
}

/// Restrict `series` to the indicators the groups actually reference.
///
/// Constant lines and the close price are left out. Referencing any member
/// of the band, MACD or KD families pulls in the whole family.
pub fn extract_relevant_series(groups: &[RuleGroup], series: &IndicatorSeries) -> IndicatorSeries {
    let constants: Vec<String> = CONSTANT_LINES.iter().map(|c| c.to_string()).collect();
    let families: [&[&str]; 3] = [&BOLLINGER_FAMILY, &MACD_FAMILY, &KD_FAMILY];

    let mut wanted: BTreeSet<&str> = BTreeSet::new();
    for param in groups.iter().flat_map(|g| g.referenced_params()) {
        if param == CLOSE || constants.iter().any(|c| c == param) {
            continue;
        }
        match families.iter().find(|family| family.contains(&param)) {
            Some(family) => wanted.extend(family.iter().copied()),
            None => {
                wanted.insert(param);
            }
        }
    }

    let mut relevant = IndicatorSeries::new();
    for name in wanted {
        if let Some(values) = series.get(name) {
            relevant.insert(name, values.to_vec());
        }
    }
    relevant
}

/// Full pipeline: indicators, signals, trades, performance.
///
/// Fewer than two bars or no rule groups yield [`BacktestResult::empty`].
pub fn run_backtest(bars: &[DailyBar], groups: &[RuleGroup], config: &BacktestConfig) -> BacktestResult {
    if bars.len() < 2 {
        warn!(bars = bars.len(), "not enough price data to backtest");
        return BacktestResult::empty();
    }
    if groups.is_empty() {
        warn!("no rule groups defined");
        return BacktestResult::empty();
    }

    let series = build_indicator_series(bars);
    let signals = generate_signals(groups, &series, bars.len());
    let trades = simulate_trades(bars, &signals.entry, &signals.exit, config.shares);
    let indicators = compute_performance(&trades, bars.len(), config.shares, config.risk_free_rate);
    let tax_rate = config.stock_type.tax_rate();
    let net_returns = trades.iter().map(|t| net_return_pct(t, tax_rate)).collect();

    info!(
        code = %config.code,
        market = %config.market,
        trades = trades.len(),
        "backtest complete: {} trades",
        trades.len()
    );

    BacktestResult {
        indicators,
        trades,
        net_returns,
        indicator_series: extract_relevant_series(groups, &series),
    }
}
