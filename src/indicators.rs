//! Technical indicators over whole price series.
//!
//! Every function is pure and returns one output value per input bar.
//!
//! The EMA is seeded with the first raw input value rather than a simple moving
//! average of the first `period` values. This is an approximation of the textbook
//! EMA that biases the earliest outputs; ATR inherits it. It is kept so results
//! stay comparable with previously recorded runs.

/// Exponential moving average with `k = 2 / (period + 1)`, seeded from `series[0]`.
///
/// ### Example
/// ```rust
/// use tradebot::indicators::ema;
///
/// let out = ema(&[10.0, 20.0], 3); // k = 0.5
/// assert_eq!(out, vec![10.0, 15.0]);
/// ```
pub fn ema(series: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period.max(1) as f64 + 1.0);
    let mut out = Vec::with_capacity(series.len());
    let mut iter = series.iter();
    if let Some(&first) = iter.next() {
        out.push(first);
        let mut prev = first;
        for &x in iter {
            prev = x * k + prev * (1.0 - k);
            out.push(prev);
        }
    }
    out
}

/// True range of every bar; the first bar has no previous close and uses `high - low`.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let len = high.len().min(low.len()).min(close.len());
    (0..len)
        .map(|i| {
            let range = high[i] - low[i];
            if i == 0 {
                return range;
            }
            let prev_close = close[i - 1];
            range
                .max((high[i] - prev_close).abs())
                .max((low[i] - prev_close).abs())
        })
        .collect()
}

/// Average true range: the [`ema`] of the [`true_range`] series.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    ema(&true_range(high, low, close), period)
}

/// Relative strength index with Wilder smoothing.
///
/// The first average gain/loss is the simple average of the first `period` moves,
/// later values use `(avg * (period - 1) + move) / period`. Outputs before index
/// `period` repeat the first computed value so the series is defined from bar 0.
///
/// With no average loss the RSI is 100 when there were gains and 50 when price did
/// not move at all. A `period` below 2 is raised to 2.
pub fn rsi(close: &[f64], period: usize) -> Vec<f64> {
    let n = period.max(2);
    if close.is_empty() {
        return Vec::new();
    }

    let (mut gain, mut loss) = (0.0, 0.0);
    for i in 1..=n.min(close.len() - 1) {
        let delta = close[i] - close[i - 1];
        if delta >= 0.0 {
            gain += delta;
        } else {
            loss -= delta;
        }
    }
    let mut avg_gain = gain / n as f64;
    let mut avg_loss = loss / n as f64;

    let first = rsi_value(avg_gain, avg_loss);
    if close.len() <= n {
        return vec![first; close.len()];
    }

    let mut out = vec![first; close.len()];
    for i in n + 1..close.len() {
        let delta = close[i] - close[i - 1];
        let (g, l) = if delta >= 0.0 { (delta, 0.0) } else { (0.0, -delta) };
        avg_gain = (avg_gain * (n - 1) as f64 + g) / n as f64;
        avg_loss = (avg_loss * (n - 1) as f64 + l) / n as f64;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ta::{Next, indicators::ExponentialMovingAverage};

    #[test]
    fn ema_empty() {
        assert!(ema(&[], 9).is_empty());
    }

    #[test]
    fn ema_seeds_from_first_value() {
        let out = ema(&[100.0, 110.0, 120.0], 9);
        assert_eq!(out[0], 100.0);
        assert!((out[1] - 102.0).abs() < 1e-12); // 110 * 0.2 + 100 * 0.8
        assert!((out[2] - 105.6).abs() < 1e-12); // 120 * 0.2 + 102 * 0.8
    }

    #[test]
    fn ema_matches_ta_crate() {
        let series = (0..50).map(|i| 100.0 + ((i as f64) * 0.7).sin() * 5.0).collect::<Vec<_>>();
        let mut reference = ExponentialMovingAverage::new(14).unwrap();
        let expected = series.iter().map(|&x| reference.next(x)).collect::<Vec<_>>();

        for (got, want) in ema(&series, 14).iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{got} != {want}");
        }
    }

    #[test]
    fn true_range_uses_previous_close() {
        let high = [12.0, 15.0, 11.0];
        let low = [10.0, 13.0, 8.0];
        let close = [11.0, 14.0, 9.0];
        // bar 0: 12 - 10, bar 1: |15 - 11|, bar 2: |8 - 14|
        assert_eq!(true_range(&high, &low, &close), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn atr_is_ema_of_true_range() {
        let high = [12.0, 15.0, 11.0];
        let low = [10.0, 13.0, 8.0];
        let close = [11.0, 14.0, 9.0];
        assert_eq!(atr(&high, &low, &close, 3), ema(&[2.0, 4.0, 6.0], 3));
    }

    #[test]
    fn rsi_backfills_warmup() {
        let close = (0..20).map(|i| 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 } * i as f64).collect::<Vec<_>>();
        let out = rsi(&close, 5);
        assert_eq!(out.len(), close.len());
        for value in &out[..5] {
            assert_eq!(*value, out[5]);
        }
    }

    #[test]
    fn rsi_only_gains_is_100() {
        let close = (0..20).map(|i| 100.0 + i as f64).collect::<Vec<_>>();
        assert!(rsi(&close, 14).iter().all(|&v| v == 100.0));
    }

    #[test]
    fn rsi_only_losses_is_0() {
        let close = (0..20).map(|i| 100.0 - i as f64).collect::<Vec<_>>();
        assert!(rsi(&close, 14).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rsi_flat_is_neutral() {
        let close = vec![100.0; 20];
        assert!(rsi(&close, 14).iter().all(|&v| v == 50.0));
    }

    #[test]
    fn rsi_wilder_smoothing() {
        // period 2: first moves +2, -1 => avg gain 1.0, avg loss 0.5
        let close = [10.0, 12.0, 11.0, 13.0];
        let out = rsi(&close, 2);
        let first = 100.0 - 100.0 / (1.0 + 2.0);
        assert!((out[2] - first).abs() < 1e-12);
        // next move +2 => gain (1.0 + 2.0) / 2 = 1.5, loss 0.5 / 2 = 0.25
        let next = 100.0 - 100.0 / (1.0 + 6.0);
        assert!((out[3] - next).abs() < 1e-12);
        assert_eq!(out[0], out[2]);
    }

    #[test]
    fn rsi_short_series() {
        assert!(rsi(&[], 14).is_empty());
        assert_eq!(rsi(&[100.0, 101.0], 14), vec![100.0, 100.0]);
    }
}
