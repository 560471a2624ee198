use crate::engine::{AccountState, Action, Candle, Signal};
use crate::errors::{Error, Result};
use crate::indicators::{atr, ema};
use crate::strategies::{DEFAULT_SIZE, MAX_PERIOD, Strategy, closes, highs, lows};

/// Stop distance in ATR units.
const ATR_STOP_MULTIPLIER: f64 = 1.5;

/// Fast/slow EMA crossover with an ATR stop.
///
/// - Buy when the fast EMA crosses above the slow EMA between the last two bars.
/// - Sell on the mirrored downward cross.
/// - Stop-loss sits `1.5 × ATR` away from the last close and take-profit at `r`
///   times that distance on the other side.
///
/// Indicators are recomputed over the whole buffer on every candle.
#[derive(Debug, Clone)]
pub struct EmaAtr {
    fast: usize,
    slow: usize,
    atr_len: usize,
    risk_reward: f64,
    buffer: Vec<Candle>,
}

impl EmaAtr {
    /// Creates the strategy.
    ///
    /// ### Arguments
    /// * `fast` - Fast EMA period.
    /// * `slow` - Slow EMA period.
    /// * `atr_len` - ATR period.
    /// * `risk_reward` - Reward multiple of the stop distance (`R`).
    ///
    /// ### Returns
    /// The strategy, or `InvalidParameters` when a period is zero or above [`MAX_PERIOD`],
    /// or `R` is not positive.
    pub fn new(fast: usize, slow: usize, atr_len: usize, risk_reward: f64) -> Result<Self> {
        if [fast, slow, atr_len].iter().any(|p| !(1..=MAX_PERIOD).contains(p)) {
            return Err(Error::InvalidParameters(format!(
                "EMA/ATR periods must be in 1..={MAX_PERIOD} (fast: {fast}, slow: {slow}, atr: {atr_len})"
            )));
        }
        if risk_reward <= 0.0 || !risk_reward.is_finite() {
            return Err(Error::InvalidParameters(format!(
                "risk/reward must be positive (got: {risk_reward})"
            )));
        }

        Ok(Self {
            fast,
            slow,
            atr_len,
            risk_reward,
            buffer: Vec::new(),
        })
    }
}

impl Strategy for EmaAtr {
    fn on_candle(&mut self, candle: &Candle, _account: &AccountState) -> Result<Signal> {
        self.buffer.push(candle.clone());
        if self.buffer.len() < self.warmup() {
            return Ok(Signal::none());
        }

        let close = closes(&self.buffer);
        let fast = ema(&close, self.fast);
        let slow = ema(&close, self.slow);
        let atr = atr(&highs(&self.buffer), &lows(&self.buffer), &close, self.atr_len);

        let (Some(&last), Some(&atr)) = (close.last(), atr.last()) else {
            return Ok(Signal::none());
        };
        tracing::debug!(last, atr, "EMA_ATR evaluated");

        let signal = if cross_up(&fast, &slow) {
            let stop_loss = last - ATR_STOP_MULTIPLIER * atr;
            let take_profit = last + self.risk_reward * (last - stop_loss);
            Signal {
                action: Action::Buy,
                size: DEFAULT_SIZE,
                stop_loss: Some(stop_loss),
                take_profit: Some(take_profit),
                comment: "ema up".to_owned(),
            }
        } else if cross_down(&fast, &slow) {
            let stop_loss = last + ATR_STOP_MULTIPLIER * atr;
            let take_profit = last - self.risk_reward * (stop_loss - last);
            Signal {
                action: Action::Sell,
                size: DEFAULT_SIZE,
                stop_loss: Some(stop_loss),
                take_profit: Some(take_profit),
                comment: "ema dn".to_owned(),
            }
        } else {
            Signal::none()
        };
        Ok(signal)
    }

    fn warmup(&self) -> usize {
        self.fast.max(self.slow).max(self.atr_len) + 2
    }

    fn name(&self) -> &str {
        "EMA_ATR"
    }
}

/// `a` moves from at-or-below `b` to strictly above it over the last two points.
fn cross_up(a: &[f64], b: &[f64]) -> bool {
    match (a, b) {
        ([.., a0, a1], [.., b0, b1]) => a0 <= b0 && a1 > b1,
        _ => false,
    }
}

/// `a` moves from at-or-above `b` to strictly below it over the last two points.
fn cross_down(a: &[f64], b: &[f64]) -> bool {
    match (a, b) {
        ([.., a0, a1], [.., b0, b1]) => a0 >= b0 && a1 < b1,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::flat_candles;

    fn run(strategy: &mut EmaAtr, closes: &[f64]) -> Vec<Signal> {
        flat_candles(closes)
            .iter()
            .map(|c| strategy.on_candle(c, &AccountState::default()).unwrap())
            .collect()
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(EmaAtr::new(0, 21, 14, 1.5), Err(Error::InvalidParameters(_))));
        assert!(matches!(EmaAtr::new(9, 21, 14, 0.0), Err(Error::InvalidParameters(_))));
        assert!(matches!(EmaAtr::new(9, MAX_PERIOD + 1, 14, 1.5), Err(Error::InvalidParameters(_))));
        assert!(matches!(EmaAtr::new(usize::MAX, 21, 14, 1.5), Err(Error::InvalidParameters(_))));
        assert!(EmaAtr::new(MAX_PERIOD, 21, 14, 1.5).is_ok());
    }

    #[test]
    fn warmup_margin() {
        assert_eq!(EmaAtr::new(9, 21, 14, 1.5).unwrap().warmup(), 23);
        assert_eq!(EmaAtr::new(50, 21, 14, 1.5).unwrap().warmup(), 52);
    }

    #[test]
    fn silent_during_warmup() {
        let mut strategy = EmaAtr::new(3, 5, 4, 2.0).unwrap();
        // zig-zag would cross repeatedly, but only 6 candles are buffered
        let signals = run(&mut strategy, &[100.0, 110.0, 90.0, 115.0, 85.0, 120.0]);
        assert!(signals.iter().all(Signal::is_none));
    }

    #[test]
    fn cross_up_sets_atr_levels() {
        let mut strategy = EmaAtr::new(2, 4, 2, 2.0).unwrap();
        // falling then a sharp rebound on the last bar
        let closes = [110.0, 108.0, 106.0, 104.0, 102.0, 100.0, 130.0];
        let signals = run(&mut strategy, &closes);

        let signal = signals.last().unwrap();
        assert_eq!(signal.action, Action::Buy);
        assert_eq!(signal.size, DEFAULT_SIZE);
        assert_eq!(signal.comment, "ema up");

        let atr = *atr(&closes, &closes, &closes, 2).last().unwrap();
        let stop = 130.0 - 1.5 * atr;
        assert!((signal.stop_loss.unwrap() - stop).abs() < 1e-9);
        assert!((signal.take_profit.unwrap() - (130.0 + 2.0 * (130.0 - stop))).abs() < 1e-9);
        assert!(signals[..6].iter().all(Signal::is_none));
    }

    #[test]
    fn cross_down_mirrors_levels() {
        let mut strategy = EmaAtr::new(2, 4, 2, 1.0).unwrap();
        let closes = [90.0, 92.0, 94.0, 96.0, 98.0, 100.0, 70.0];
        let signal = run(&mut strategy, &closes).pop().unwrap();

        assert_eq!(signal.action, Action::Sell);
        assert_eq!(signal.comment, "ema dn");
        let stop = signal.stop_loss.unwrap();
        assert!(stop > 70.0);
        assert!((signal.take_profit.unwrap() - (70.0 - (stop - 70.0))).abs() < 1e-9);
    }

    #[test]
    fn cross_needs_two_points() {
        assert!(!cross_up(&[1.0], &[0.0]));
        assert!(cross_up(&[1.0, 2.0], &[1.0, 1.5]));
        assert!(!cross_up(&[2.0, 3.0], &[1.0, 1.5]));
        assert!(cross_down(&[2.0, 1.0], &[2.0, 1.5]));
    }
}
