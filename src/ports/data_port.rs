//! Price data access port trait.

use crate::domain::error::BacktestError;
use crate::domain::market::Market;
use crate::domain::ohlcv::DailyBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `code` between `start_date` and `end_date` inclusive,
    /// ascending by date.
    fn fetch_daily(
        &self,
        market: Market,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, BacktestError>;

    /// First and last available dates, or `None` when nothing is stored.
    fn date_range(
        &self,
        market: Market,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, BacktestError>;
}
