//! Simple moving average.
//!
//! Maintains a running window sum (subtract the oldest close, add the newest)
//! so the whole series costs O(n).
//!
//! Warmup: first (period-1) positions are `None`.

use super::Series;

pub fn calculate_ma(closes: &[f64], period: usize) -> Series {
    let n = closes.len();
    let mut values = vec![None; n];
    if period == 0 || n < period {
        return values;
    }

    let mut window_sum: f64 = closes[..period].iter().sum();
    values[period - 1] = Some(window_sum / period as f64);

    for i in period..n {
        window_sum += closes[i] - closes[i - period];
        values[i] = Some(window_sum / period as f64);
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn ma_basic() {
        let values = calculate_ma(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert_eq!(values, vec![None, None, Some(20.0), Some(30.0), Some(40.0)]);
    }

    #[test]
    fn ma_warmup_all_none() {
        let values = calculate_ma(&[10.0, 20.0], 5);
        assert_eq!(values, vec![None, None]);
    }

    #[test]
    fn ma_empty() {
        assert!(calculate_ma(&[], 5).is_empty());
    }

    #[test]
    fn ma_zero_period() {
        let values = calculate_ma(&[1.0, 2.0, 3.0], 0);
        assert!(values.iter().all(|v| v.is_none()));
    }

    #[test]
    fn ma_period_one_is_identity() {
        let closes = [3.5, 4.25, 1.0];
        let values = calculate_ma(&closes, 1);
        for (v, c) in values.iter().zip(closes.iter()) {
            assert_relative_eq!(v.unwrap(), *c);
        }
    }

    proptest! {
        #[test]
        fn ma_matches_window_mean(
            closes in prop::collection::vec(1.0f64..1000.0, 1..60),
            period in 1usize..20,
        ) {
            let values = calculate_ma(&closes, period);
            prop_assert_eq!(values.len(), closes.len());
            for (i, v) in values.iter().enumerate() {
                if i + 1 < period {
                    prop_assert!(v.is_none());
                } else {
                    let window = &closes[i + 1 - period..=i];
                    let mean = window.iter().sum::<f64>() / period as f64;
                    prop_assert!((v.unwrap() - mean).abs() < 1e-6);
                }
            }
        }
    }
}
