//! Risk models applied to every signal before it reaches the engine.

use crate::engine::{AccountState, Action, Signal};
use crate::errors::{Error, Result};

/// Default cap on the fraction of equity committed per trade.
pub const DEFAULT_MAX_PER_TRADE: f64 = 0.02;

/// Validates and adjusts a signal, or rejects it.
pub trait RiskModel: Send + Sync {
    /// Returns the signal the engine should act on.
    ///
    /// ### Arguments
    /// * `signal` - The strategy's proposal.
    /// * `account` - Snapshot of the account at the current candle.
    /// * `price` - Last close.
    fn validate(&self, signal: Signal, account: &AccountState, price: f64) -> Result<Signal>;
}

/// Built-in risk models.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskProfile {
    /// Rejects non-positive sizes and clamps the rest to `max_per_trade`.
    FixedCap {
        /// Largest accepted fraction of equity.
        max_per_trade: f64,
    },
    /// Scales entry sizes by `leverage`, capped at `leverage`. Closes pass unchanged.
    Leveraged {
        /// Multiplier applied to entry sizes; `<= 1` disables scaling.
        leverage: f64,
    },
    /// Accepts every signal unchanged.
    PassThrough,
}

impl RiskProfile {
    /// Fixed-fraction cap model.
    pub fn fixed_cap(max_per_trade: f64) -> Self {
        Self::FixedCap { max_per_trade }
    }

    /// Leverage model used by backtests.
    pub fn leveraged(leverage: f64) -> Self {
        Self::Leveraged { leverage }
    }
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self::fixed_cap(DEFAULT_MAX_PER_TRADE)
    }
}

impl RiskModel for RiskProfile {
    fn validate(&self, mut signal: Signal, _account: &AccountState, _price: f64) -> Result<Signal> {
        match *self {
            Self::FixedCap { .. } if signal.action == Action::Close => {}
            Self::FixedCap { max_per_trade } => {
                if signal.size <= 0.0 || signal.size.is_nan() {
                    return Err(Error::RiskRejected(format!("size must be positive (got: {})", signal.size)));
                }
                signal.size = signal.size.min(max_per_trade);
            }
            Self::Leveraged { leverage } => {
                if leverage > 1.0 && matches!(signal.action, Action::Buy | Action::Sell) {
                    signal.size = (signal.size * leverage).min(leverage);
                }
            }
            Self::PassThrough => {}
        }
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(action: Action, size: f64) -> Signal {
        (action, size).into()
    }

    fn validate(model: RiskProfile, signal: Signal) -> Result<Signal> {
        model.validate(signal, &AccountState::default(), 100.0)
    }

    #[test]
    fn fixed_cap_clamps() {
        let model = RiskProfile::default();
        assert_eq!(validate(model, signal(Action::Buy, 0.5)).unwrap().size, 0.02);
        assert_eq!(validate(model, signal(Action::Sell, 0.01)).unwrap().size, 0.01);
    }

    #[test]
    fn fixed_cap_rejects_empty_size() {
        let model = RiskProfile::fixed_cap(0.02);
        assert!(matches!(validate(model, signal(Action::Buy, 0.0)), Err(Error::RiskRejected(_))));
        assert!(matches!(validate(model, signal(Action::Buy, -1.0)), Err(Error::RiskRejected(_))));
    }

    #[test]
    fn fixed_cap_passes_closes() {
        let model = RiskProfile::fixed_cap(0.02);
        let close = Signal::close("exit");
        assert_eq!(validate(model, close.clone()).unwrap(), close);
    }

    #[test]
    fn leverage_scales_entries() {
        let model = RiskProfile::leveraged(3.0);
        assert_eq!(validate(model, signal(Action::Buy, 0.02)).unwrap().size, 0.06);
        assert_eq!(validate(model, signal(Action::Sell, 2.0)).unwrap().size, 3.0);
        assert_eq!(validate(model, signal(Action::Close, 0.5)).unwrap().size, 0.5);
    }

    #[test]
    fn leverage_one_passes_through() {
        let model = RiskProfile::leveraged(1.0);
        let signal = signal(Action::Buy, 0.02);
        assert_eq!(validate(model, signal.clone()).unwrap(), signal);
    }
}
