//! Technical indicator engine.
//!
//! Every indicator is a pure function from price columns to a
//! `Vec<Option<f64>>` of the same length as its input. Positions whose
//! warm-up window is not yet satisfied hold `None`.
//!
//! [`build_indicator_series`] assembles the full name → array mapping that
//! rule conditions reference by key.

pub mod bollinger;
pub mod ema;
pub mod kd;
pub mod ma;
pub mod macd;
pub mod rsi;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use kd::calculate_kd;
pub use ma::calculate_ma;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;

use crate::domain::ohlcv::{price_columns, DailyBar};
use serde::Serialize;
use std::collections::BTreeMap;

pub const CLOSE: &str = "收盤價";
pub const UPPER_BAND: &str = "上軌";
pub const MIDDLE_BAND: &str = "中軌";
pub const LOWER_BAND: &str = "下軌";
pub const DIF: &str = "DIF";
pub const MACD: &str = "MACD";
pub const OSC: &str = "OSC";
pub const K: &str = "K";
pub const D: &str = "D";

pub const MA_PERIODS: [usize; 6] = [5, 10, 20, 60, 120, 240];
pub const RSI_PERIODS: [usize; 3] = [6, 12, 24];
pub const CONSTANT_LINES: [u32; 6] = [0, 20, 30, 50, 70, 80];

pub const BOLLINGER_FAMILY: [&str; 3] = [UPPER_BAND, MIDDLE_BAND, LOWER_BAND];
pub const MACD_FAMILY: [&str; 3] = [DIF, MACD, OSC];
pub const KD_FAMILY: [&str; 2] = [K, D];

/// A single indicator array, pointwise aligned with the bar sequence.
pub type Series = Vec<Option<f64>>;

/// Mapping from indicator name to its array.
///
/// Backed by a `BTreeMap` so iteration (and therefore serialized output) is
/// deterministic across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IndicatorSeries {
    series: BTreeMap<String, Series>,
}

impl IndicatorSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Series) {
        self.series.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<&[Option<f64>]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.series.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Round to `decimals` places, half to even on the exact stored value.
///
/// Goes through decimal formatting, so `2.675` (stored just below) becomes
/// `2.67` and the exact tie `6.25` becomes `6.2`.
pub(crate) fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

/// Name of the moving-average series for `period`, e.g. `MA20`.
pub fn ma_name(period: usize) -> String {
    format!("MA{}", period)
}

/// Name of the RSI series for `period`, e.g. `RSI12`.
pub fn rsi_name(period: usize) -> String {
    format!("RSI{}", period)
}

/// Compute every indicator the rule conditions can reference.
pub fn build_indicator_series(bars: &[DailyBar]) -> IndicatorSeries {
    let (closes, highs, lows) = price_columns(bars);
    let n = closes.len();
    let mut series = IndicatorSeries::new();

    series.insert(CLOSE, closes.iter().copied().map(Some).collect());

    for period in MA_PERIODS {
        series.insert(ma_name(period), calculate_ma(&closes, period));
    }

    for period in RSI_PERIODS {
        series.insert(rsi_name(period), calculate_rsi(&closes, period));
    }

    let macd = calculate_macd(
        &closes,
        macd::DEFAULT_FAST,
        macd::DEFAULT_SLOW,
        macd::DEFAULT_SIGNAL,
    );
    series.insert(DIF, macd.dif);
    series.insert(MACD, macd.signal);
    series.insert(OSC, macd.osc);

    let kd = calculate_kd(&highs, &lows, &closes, kd::DEFAULT_PERIOD, kd::DEFAULT_SMOOTH);
    series.insert(K, kd.k);
    series.insert(D, kd.d);

    let bands = calculate_bollinger(&closes, bollinger::DEFAULT_PERIOD, bollinger::DEFAULT_MULT);
    series.insert(UPPER_BAND, bands.upper);
    series.insert(MIDDLE_BAND, bands.middle);
    series.insert(LOWER_BAND, bands.lower);

    for constant in CONSTANT_LINES {
        series.insert(constant.to_string(), vec![Some(constant as f64); n]);
    }

    series
}
