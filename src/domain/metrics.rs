//! Performance indicators computed from a closed-trade ledger.
//!
//! Every run reports the same eight indicators, in this order:
//! win rate, profit factor, expected value, max drawdown, Sharpe ratio,
//! profit/loss ratio, annual return, total trades.

use super::backtest::Trade;
use super::indicator::round_to;
use serde::Serialize;

pub const TRADING_DAYS_PER_YEAR: f64 = 250.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.015;

/// Reported when the denominator of a ratio has no losing trades.
pub const NO_LOSS_SENTINEL: f64 = 999.99;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceIndicator {
    pub code: &'static str,
    pub name: &'static str,
    pub value: f64,
    pub unit: &'static str,
    pub description: &'static str,
}

struct IndicatorDef {
    code: &'static str,
    name: &'static str,
    unit: &'static str,
    description: &'static str,
}

const WIN_RATE: IndicatorDef = IndicatorDef {
    code: "win_rate",
    name: "勝率",
    unit: "%",
    description: "獲利交易佔總交易次數的比例",
};
const PROFIT_FACTOR: IndicatorDef = IndicatorDef {
    code: "profit_factor",
    name: "獲利因子",
    unit: "倍",
    description: "總獲利金額除以總虧損金額",
};
const EXPECTED_VALUE: IndicatorDef = IndicatorDef {
    code: "expected_value",
    name: "期望值",
    unit: "元",
    description: "每筆交易的平均預期損益",
};
const MAX_DRAWDOWN: IndicatorDef = IndicatorDef {
    code: "max_drawdown",
    name: "最大回撤",
    unit: "%",
    description: "從資產高點到低點的最大跌幅",
};
const SHARPE_RATIO: IndicatorDef = IndicatorDef {
    code: "sharpe_ratio",
    name: "夏普比率",
    unit: "倍",
    description: "每承受一單位風險所獲得的超額報酬",
};
const PROFIT_LOSS_RATIO: IndicatorDef = IndicatorDef {
    code: "profit_loss_ratio",
    name: "平均獲利虧損比",
    unit: "倍",
    description: "平均獲利金額除以平均虧損金額",
};
const ANNUAL_RETURN: IndicatorDef = IndicatorDef {
    code: "annual_return",
    name: "年化報酬率",
    unit: "%",
    description: "投資報酬換算為年度的複利報酬率",
};
const TOTAL_TRADES: IndicatorDef = IndicatorDef {
    code: "total_trades",
    name: "總交易次數",
    unit: "次",
    description: "回測期間的總交易筆數",
};

const ALL_DEFS: [&IndicatorDef; 8] = [
    &WIN_RATE,
    &PROFIT_FACTOR,
    &EXPECTED_VALUE,
    &MAX_DRAWDOWN,
    &SHARPE_RATIO,
    &PROFIT_LOSS_RATIO,
    &ANNUAL_RETURN,
    &TOTAL_TRADES,
];

impl IndicatorDef {
    fn with_value(&self, value: f64) -> PerformanceIndicator {
        PerformanceIndicator {
            code: self.code,
            name: self.name,
            value,
            unit: self.unit,
            description: self.description,
        }
    }
}

impl PerformanceIndicator {
    /// Value rendered with its unit: `62.5%`, `1.85 倍`, `1,250 元`, `128 次`.
    pub fn formatted_value(&self) -> String {
        let v = self.value;
        let whole = v.is_finite() && v.fract() == 0.0;
        match self.unit {
            "%" => format!("{}%", plain_number(v)),
            "元" if whole => format!("{} 元", with_thousands(v, 0)),
            "元" => format!("{} 元", with_thousands(v, 2)),
            unit if whole => format!("{} {}", with_thousands(v, 0), unit),
            unit => format!("{} {}", plain_number(v), unit),
        }
    }
}

/// Shortest round-trip rendering, always with a fractional part.
fn plain_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

fn with_thousands(v: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, v.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if v < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

/// The eight indicators with value 0, reported when there is nothing to
/// measure.
pub fn zero_indicators() -> Vec<PerformanceIndicator> {
    ALL_DEFS.iter().map(|def| def.with_value(0.0)).collect()
}

pub fn compute_performance(
    trades: &[Trade],
    bar_count: usize,
    shares: u32,
    risk_free_rate: f64,
) -> Vec<PerformanceIndicator> {
    if trades.is_empty() {
        return zero_indicators();
    }

    let total = trades.len();
    let shares = f64::from(shares);

    let win_sum: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let loss_sum: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| t.pnl).sum();
    let wins = trades.iter().filter(|t| t.pnl > 0.0).count();
    let losses = trades.iter().filter(|t| t.pnl < 0.0).count();

    let win_rate = wins as f64 / total as f64 * 100.0;

    let profit_factor = if loss_sum != 0.0 {
        win_sum / loss_sum.abs()
    } else {
        NO_LOSS_SENTINEL
    };

    let expected_value = trades.iter().map(|t| t.pnl).sum::<f64>() / total as f64;

    let avg_profit = if wins > 0 { win_sum / wins as f64 } else { 0.0 };
    let avg_loss = if losses > 0 {
        loss_sum.abs() / losses as f64
    } else {
        0.0
    };
    let profit_loss_ratio = if avg_loss > 0.0 {
        avg_profit / avg_loss
    } else {
        NO_LOSS_SENTINEL
    };

    let initial_capital = trades[0].entry_price * shares;
    let max_drawdown = max_drawdown_pct(trades, initial_capital);
    let annual_return = annual_return_pct(trades, initial_capital, bar_count);
    let sharpe_ratio = sharpe_ratio(trades, bar_count, shares, risk_free_rate);

    vec![
        WIN_RATE.with_value(round_to(win_rate, 1)),
        PROFIT_FACTOR.with_value(round_to(profit_factor, 2)),
        EXPECTED_VALUE.with_value(round_to(expected_value, 2)),
        MAX_DRAWDOWN.with_value(0.0 - round_to(max_drawdown, 2)),
        SHARPE_RATIO.with_value(round_to(sharpe_ratio, 2)),
        PROFIT_LOSS_RATIO.with_value(round_to(profit_loss_ratio, 2)),
        ANNUAL_RETURN.with_value(round_to(annual_return, 2)),
        TOTAL_TRADES.with_value(total as f64),
    ]
}

/// Largest peak-to-trough decline of the trade-by-trade equity curve, as a
/// positive percentage.
fn max_drawdown_pct(trades: &[Trade], initial_capital: f64) -> f64 {
    let mut equity = initial_capital;
    let mut peak = initial_capital;
    let mut max_dd = 0.0_f64;

    for trade in trades {
        equity += trade.pnl;
        if equity > peak {
            peak = equity;
        }
        if peak > 0.0 {
            let dd = (peak - equity) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

fn annual_return_pct(trades: &[Trade], initial_capital: f64, bar_count: usize) -> f64 {
    let final_capital = initial_capital + trades.iter().map(|t| t.pnl).sum::<f64>();
    let years = bar_count as f64 / TRADING_DAYS_PER_YEAR;

    if initial_capital > 0.0 && final_capital > 0.0 && years > 0.0 {
        ((final_capital / initial_capital).powf(1.0 / years) - 1.0) * 100.0
    } else if initial_capital > 0.0 && years > 0.0 {
        -100.0
    } else {
        0.0
    }
}

/// Return of one trade in percent, net of `tax_rate`, rounded to 2 places.
/// `None` when the entry price is not positive.
pub fn net_return_pct(trade: &Trade, tax_rate: f64) -> Option<f64> {
    (trade.entry_price > 0.0).then(|| {
        let gross = (trade.exit_price - trade.entry_price) / trade.entry_price;
        round_to((gross - tax_rate) * 100.0, 2)
    })
}

/// Annualized Sharpe ratio over per-trade returns.
///
/// Trades per year are estimated as `250 / max(bar_count / trades, 1)`.
fn sharpe_ratio(trades: &[Trade], bar_count: usize, shares: f64, risk_free_rate: f64) -> f64 {
    let returns: Vec<f64> = trades
        .iter()
        .filter_map(|t| {
            let cost = t.entry_price * shares;
            (cost > 0.0).then(|| t.pnl / cost)
        })
        .collect();

    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = if variance > 0.0 { variance.sqrt() } else { 0.0 };

    let bars_per_trade = (bar_count as f64 / trades.len() as f64).max(1.0);
    let trades_per_year = TRADING_DAYS_PER_YEAR / bars_per_trade;

    let annual_mean = mean * trades_per_year;
    let annual_std = stddev * trades_per_year.sqrt();
    if annual_std > 0.0 {
        (annual_mean - risk_free_rate) / annual_std
    } else {
        0.0
    }
}
