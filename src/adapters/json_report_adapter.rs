//! JSON report adapter implementing ReportPort.
//!
//! Writes `{ "indicators": [...], "trades": [...], "net_returns": [...],
//! "indicator_series": {...} }`
//! with warm-up positions as `null`.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;
use crate::ports::report_port::ReportPort;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportAdapter {
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), BacktestError> {
        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, result)?;
        } else {
            serde_json::to_writer(&mut writer, result)?;
        }
        writer.write_all(b"\n")?;
        writer.flush()?;

        info!(path = %path.display(), trades = result.trades.len(), "report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::Trade;
    use crate::domain::indicator::IndicatorSeries;
    use crate::domain::metrics::zero_indicators;
    use tempfile::TempDir;

    fn sample_result() -> BacktestResult {
        let mut series = IndicatorSeries::new();
        series.insert("MA5", vec![None, None, Some(10.5)]);
        BacktestResult {
            indicators: zero_indicators(),
            trades: vec![Trade {
                entry_price: 10.0,
                exit_price: 11.0,
                pnl: 1000.0,
                entry_index: 1,
                exit_index: 2,
                entry_date: "2024-01-02".to_string(),
                exit_date: "2024-01-03".to_string(),
            }],
            net_returns: vec![Some(9.62)],
            indicator_series: series,
        }
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_report_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");

        JsonReportAdapter::new()
            .write(&sample_result(), path.to_str().unwrap())
            .unwrap();

        let json = read_json(&path);
        assert_eq!(json["indicators"].as_array().unwrap().len(), 8);
        assert_eq!(json["indicators"][0]["code"], "win_rate");
        assert_eq!(json["indicators"][0]["name"], "勝率");
        assert_eq!(json["trades"][0]["entry_date"], "2024-01-02");
        assert_eq!(json["trades"][0]["pnl"], 1000.0);
        assert_eq!(json["net_returns"][0], 9.62);
        assert!(json["indicator_series"]["MA5"][0].is_null());
        assert_eq!(json["indicator_series"]["MA5"][2], 10.5);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out").join("report.json");

        JsonReportAdapter::pretty()
            .write(&sample_result(), path.to_str().unwrap())
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"indicators\""));
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        // a directory cannot be opened as a file
        let err = JsonReportAdapter::new()
            .write(&sample_result(), dir.path().to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, BacktestError::Io(_)));
    }
}
