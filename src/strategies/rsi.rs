use crate::Percent;
use crate::engine::{AccountState, Action, Candle, Signal};
use crate::errors::{Error, Result};
use crate::indicators::rsi;
use crate::strategies::{DEFAULT_SIZE, MAX_PERIOD, Strategy, closes};

/// Stop distance from the last close, in percent.
const STOP_PERCENT: f64 = 1.0;

/// RSI threshold strategy.
///
/// Buys when the RSI of the last close is at or below `oversold`, sells when it is at
/// or above `overbought`. The stop sits 1% away from the last close.
#[derive(Debug, Clone)]
pub struct Rsi {
    len: usize,
    overbought: f64,
    oversold: f64,
    risk_reward: f64,
    buffer: Vec<Candle>,
}

impl Rsi {
    /// Creates the strategy.
    ///
    /// ### Arguments
    /// * `len` - RSI period, from 2 to [`MAX_PERIOD`].
    /// * `overbought` - Upper threshold.
    /// * `oversold` - Lower threshold, strictly below `overbought`.
    /// * `risk_reward` - Reward multiple of the stop distance (`R`).
    ///
    /// ### Returns
    /// The strategy or `InvalidParameters`.
    pub fn new(len: usize, overbought: f64, oversold: f64, risk_reward: f64) -> Result<Self> {
        if !(2..=MAX_PERIOD).contains(&len) {
            return Err(Error::InvalidParameters(format!(
                "RSI length must be in 2..={MAX_PERIOD} (got: {len})"
            )));
        }
        if !(0.0..=100.0).contains(&oversold) || !(0.0..=100.0).contains(&overbought) || oversold >= overbought {
            return Err(Error::InvalidParameters(format!(
                "RSI thresholds must satisfy 0 <= oversold < overbought <= 100 (got: {oversold}, {overbought})"
            )));
        }
        if risk_reward <= 0.0 || !risk_reward.is_finite() {
            return Err(Error::InvalidParameters(format!(
                "risk/reward must be positive (got: {risk_reward})"
            )));
        }

        Ok(Self {
            len,
            overbought,
            oversold,
            risk_reward,
            buffer: Vec::new(),
        })
    }
}

impl Strategy for Rsi {
    fn on_candle(&mut self, candle: &Candle, _account: &AccountState) -> Result<Signal> {
        self.buffer.push(candle.clone());
        if self.buffer.len() < self.warmup() {
            return Ok(Signal::none());
        }

        let close = closes(&self.buffer);
        let (Some(&last), Some(&value)) = (close.last(), rsi(&close, self.len).last()) else {
            return Ok(Signal::none());
        };
        tracing::debug!(last, rsi = value, "RSI evaluated");

        if value <= self.oversold {
            let stop_loss = last.down_pct(STOP_PERCENT);
            return Ok(Signal {
                action: Action::Buy,
                size: DEFAULT_SIZE,
                stop_loss: Some(stop_loss),
                take_profit: Some(last + self.risk_reward * (last - stop_loss)),
                comment: "rsi long".to_owned(),
            });
        }
        if value >= self.overbought {
            let stop_loss = last.up_pct(STOP_PERCENT);
            return Ok(Signal {
                action: Action::Sell,
                size: DEFAULT_SIZE,
                stop_loss: Some(stop_loss),
                take_profit: Some(last - self.risk_reward * (stop_loss - last)),
                comment: "rsi short".to_owned(),
            });
        }
        Ok(Signal::none())
    }

    fn warmup(&self) -> usize {
        self.len + 2
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::flat_candles;

    fn last_signal(strategy: &mut Rsi, closes: &[f64]) -> Signal {
        let mut last = Signal::none();
        for candle in flat_candles(closes) {
            last = strategy.on_candle(&candle, &AccountState::default()).unwrap();
        }
        last
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(Rsi::new(1, 70.0, 30.0, 1.5), Err(Error::InvalidParameters(_))));
        assert!(matches!(Rsi::new(14, 30.0, 70.0, 1.5), Err(Error::InvalidParameters(_))));
        assert!(matches!(Rsi::new(14, 120.0, 30.0, 1.5), Err(Error::InvalidParameters(_))));
        assert!(matches!(Rsi::new(14, 70.0, 30.0, -1.0), Err(Error::InvalidParameters(_))));
        assert!(matches!(Rsi::new(usize::MAX, 70.0, 30.0, 1.5), Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn oversold_buys() {
        let mut strategy = Rsi::new(5, 70.0, 30.0, 2.0).unwrap();
        let closes = (0..10).map(|i| 200.0 - i as f64).collect::<Vec<_>>();
        let signal = last_signal(&mut strategy, &closes);

        assert_eq!(signal.action, Action::Buy);
        assert_eq!(signal.comment, "rsi long");
        let stop = signal.stop_loss.unwrap();
        assert!((stop - 191.0 * 0.99).abs() < 1e-9);
        assert!((signal.take_profit.unwrap() - (191.0 + 2.0 * (191.0 - stop))).abs() < 1e-9);
    }

    #[test]
    fn overbought_sells() {
        let mut strategy = Rsi::new(5, 70.0, 30.0, 1.0).unwrap();
        let closes = (0..10).map(|i| 100.0 + i as f64).collect::<Vec<_>>();
        let signal = last_signal(&mut strategy, &closes);

        assert_eq!(signal.action, Action::Sell);
        assert_eq!(signal.comment, "rsi short");
        assert!((signal.stop_loss.unwrap() - 109.0 * 1.01).abs() < 1e-9);
    }

    #[test]
    fn flat_prices_stay_neutral() {
        let mut strategy = Rsi::new(5, 70.0, 30.0, 1.5).unwrap();
        assert!(last_signal(&mut strategy, &[100.0; 30]).is_none());
    }

    #[test]
    fn silent_until_warm() {
        let mut strategy = Rsi::new(5, 70.0, 30.0, 1.5).unwrap();
        // falling prices, but one candle short of the warm-up
        let closes = (0..6).map(|i| 200.0 - i as f64).collect::<Vec<_>>();
        assert!(last_signal(&mut strategy, &closes).is_none());
    }
}
