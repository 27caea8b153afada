//! CSV file data adapter.
//!
//! One file per security at `{base}/{code}_{market}.csv` with header
//! `date,open,high,low,close,volume`.

use crate::domain::error::BacktestError;
use crate::domain::market::Market;
use crate::domain::ohlcv::DailyBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, market: Market, code: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", code, market))
    }

    /// Every bar in the file, ascending; `None` if the file does not exist.
    fn read_bars(&self, market: Market, code: &str) -> Result<Option<Vec<DailyBar>>, BacktestError> {
        let path = self.csv_path(market, code);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BacktestError::Data {
                    reason: format!("failed to read {}: {}", path.display(), e),
                })
            }
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| BacktestError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = column(&record, 0, "date", row)?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                BacktestError::Data {
                    reason: format!("row {}: invalid date '{}': {}", row + 1, date_str, e),
                }
            })?;

            bars.push(DailyBar {
                date,
                open: parse_column(&record, 1, "open", row)?,
                high: parse_column(&record, 2, "high", row)?,
                low: parse_column(&record, 3, "low", row)?,
                close: parse_column(&record, 4, "close", row)?,
                volume: parse_column(&record, 5, "volume", row)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        debug!(path = %path.display(), bars = bars.len(), "loaded price file");
        Ok(Some(bars))
    }
}

fn column<'r>(record: &'r csv::StringRecord, index: usize, name: &str, row: usize) -> Result<&'r str, BacktestError> {
    record.get(index).ok_or_else(|| BacktestError::Data {
        reason: format!("row {}: missing {} column", row + 1, name),
    })
}

fn parse_column<T>(record: &csv::StringRecord, index: usize, name: &str, row: usize) -> Result<T, BacktestError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = column(record, index, name, row)?;
    raw.trim().parse().map_err(|e| BacktestError::Data {
        reason: format!("row {}: invalid {} value '{}': {}", row + 1, name, raw, e),
    })
}

impl DataPort for CsvAdapter {
    fn fetch_daily(
        &self,
        market: Market,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailyBar>, BacktestError> {
        let bars = self
            .read_bars(market, code)?
            .ok_or_else(|| BacktestError::NoData {
                code: code.to_string(),
                market: market.to_string(),
            })?;

        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect())
    }

    fn date_range(
        &self,
        market: Market,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, BacktestError> {
        let bars = self.read_bars(market, code)?.unwrap_or_default();
        Ok(bars.first().zip(bars.last()).map(|(f, l)| (f.date, l.date)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        // deliberately out of order
        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n";

        fs::write(path.join("2330_TWSE.csv"), csv_content).unwrap();
        fs::write(path.join("6488_TPEX.csv"), "date,open,high,low,close,volume\n").unwrap();
        fs::write(
            path.join("9999_TWSE.csv"),
            "date,open,high,low,close,volume\n2024-01-15,abc,1,1,1,1\n",
        )
        .unwrap();

        (dir, path)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn fetch_daily_returns_sorted_bars() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_daily(Market::Twse, "2330", day(1), day(31)).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, day(15));
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000);
        assert_eq!(bars[2].date, day(17));
    }

    #[test]
    fn fetch_daily_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let bars = adapter.fetch_daily(Market::Twse, "2330", day(16), day(16)).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, day(16));
    }

    #[test]
    fn market_is_part_of_file_name() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_daily(Market::Tpex, "2330", day(1), day(31)).unwrap_err();
        assert!(matches!(err, BacktestError::NoData { .. }));
        assert!(adapter.fetch_daily(Market::Tpex, "6488", day(1), day(31)).unwrap().is_empty());
    }

    #[test]
    fn invalid_value_is_data_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_daily(Market::Twse, "9999", day(1), day(31)).unwrap_err();
        match err {
            BacktestError::Data { reason } => assert!(reason.contains("open")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn date_range_spans_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        assert_eq!(
            adapter.date_range(Market::Twse, "2330").unwrap(),
            Some((day(15), day(17)))
        );
        assert_eq!(adapter.date_range(Market::Tpex, "6488").unwrap(), None);
        assert_eq!(adapter.date_range(Market::Twse, "0000").unwrap(), None);
    }
}
