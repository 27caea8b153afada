//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! DIF = EMA(fast) - EMA(slow)
//! MACD (signal line) = EMA(signal) of DIF, computed only over the
//! positions where DIF is defined and realigned to the bar index
//! OSC = (DIF - MACD) * 2
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: DIF from slow-1, MACD/OSC from slow-1 + signal-1.

use super::{calculate_ema, Series};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub dif: Series,
    pub signal: Series,
    pub osc: Series,
}

pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let n = closes.len();
    let mut out = MacdSeries {
        dif: vec![None; n],
        signal: vec![None; n],
        osc: vec![None; n],
    };
    if fast == 0 || slow == 0 || signal_period == 0 || n < slow {
        return out;
    }

    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    let mut defined: Vec<f64> = Vec::with_capacity(n);
    for i in 0..n {
        if let (Some(f), Some(s)) = (ema_fast[i], ema_slow[i]) {
            out.dif[i] = Some(f - s);
            defined.push(f - s);
        }
    }

    if defined.len() < signal_period {
        return out;
    }

    let offset = n - defined.len();
    for (j, value) in calculate_ema(&defined, signal_period).into_iter().enumerate() {
        let idx = offset + j;
        out.signal[idx] = value;
        if let (Some(sig), Some(dif)) = (value, out.dif[idx]) {
            out.osc[idx] = Some((dif - sig) * 2.0);
        }
    }

    out
}
