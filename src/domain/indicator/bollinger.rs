//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle (中軌): Simple Moving Average (SMA) over n periods
//! - Upper (上軌): Middle + (multiplier × StdDev)
//! - Lower (下軌): Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) positions are `None`.

use super::Series;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

pub fn calculate_bollinger(closes: &[f64], period: usize, mult: f64) -> BollingerSeries {
    let n = closes.len();
    let mut out = BollingerSeries {
        upper: vec![None; n],
        middle: vec![None; n],
        lower: vec![None; n],
    };
    if period == 0 || n < period {
        return out;
    }

    for i in (period - 1)..n {
        let window = &closes[i + 1 - period..=i];
        let mean: f64 = window.iter().sum::<f64>() / period as f64;
        let variance: f64 = window
            .iter()
            .map(|c| {
                let diff = c - mean;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let width = mult * variance.sqrt();

        out.middle[i] = Some(mean);
        out.upper[i] = Some(mean + width);
        out.lower[i] = Some(mean - width);
    }

    out
}
