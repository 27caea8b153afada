//! Exponential moving average.
//!
//! Seeds with the SMA of the first `period` inputs, then recurses with
//! multiplier k = 2 / (period + 1):
//!
//! EMA = (value - prev_EMA) * k + prev_EMA
//!
//! Warmup: first (period-1) positions are `None`.

use super::Series;

pub fn calculate_ema(values: &[f64], period: usize) -> Series {
    let n = values.len();
    let mut result = vec![None; n];
    if period == 0 || n < period {
        return result;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = Some(ema);

    for i in period..n {
        ema = (values[i] - ema) * k + ema;
        result[i] = Some(ema);
    }

    result
}
