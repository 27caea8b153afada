//! KD (stochastic oscillator) indicator, Taiwan-market convention.
//!
//! RSV = (close - lowest_low) / (highest_high - lowest_low) * 100 over the
//! trailing `period` bars, or 50 when the high/low range is zero.
//!
//! K = (K_prev * (smooth-1) + RSV) / smooth
//! D = (D_prev * (smooth-1) + K) / smooth
//!
//! K_prev and D_prev start at 50. Stored values are rounded to 2 decimals;
//! the recursion carries the unrounded values.
//!
//! Warmup: first (period-1) positions are `None`.

use super::{round_to, Series};

pub const DEFAULT_PERIOD: usize = 9;
pub const DEFAULT_SMOOTH: usize = 3;

const KD_SEED: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct KdSeries {
    pub k: Series,
    pub d: Series,
}

pub fn calculate_kd(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
    smooth: usize,
) -> KdSeries {
    let n = closes.len().min(highs.len()).min(lows.len());
    let mut out = KdSeries {
        k: vec![None; closes.len()],
        d: vec![None; closes.len()],
    };
    if period == 0 || smooth == 0 || n < period {
        return out;
    }

    let weight = (smooth - 1) as f64;
    let mut k_prev = KD_SEED;
    let mut d_prev = KD_SEED;

    for i in (period - 1)..n {
        let start = i + 1 - period;
        let highest = highs[start..=i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lowest = lows[start..=i].iter().copied().fold(f64::INFINITY, f64::min);

        let rsv = if highest == lowest {
            50.0
        } else {
            (closes[i] - lowest) / (highest - lowest) * 100.0
        };

        let k = (k_prev * weight + rsv) / smooth as f64;
        let d = (d_prev * weight + k) / smooth as f64;
        out.k[i] = Some(round_to(k, 2));
        out.d[i] = Some(round_to(d, 2));
        k_prev = k;
        d_prev = d;
    }

    out
}
