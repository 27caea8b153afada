//! Daily price bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl DailyBar {
    /// Human-readable `YYYY-MM-DD` date used in trade ledgers.
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Split bars into the close/high/low columns the indicator engine consumes.
pub fn price_columns(bars: &[DailyBar]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let closes = bars.iter().map(|b| b.close).collect();
    let highs = bars.iter().map(|b| b.high).collect();
    let lows = bars.iter().map(|b| b.low).collect();
    (closes, highs, lows)
}
