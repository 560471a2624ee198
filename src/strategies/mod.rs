//! Trading strategies.
//!
//! Every strategy implements the [`Strategy`] trait so the engine can drive it without
//! knowing its internals. The built-in ones are gathered in the closed
//! [`BuiltinStrategy`] enum, which is what configuration resolves to.

mod ema_atr;
mod rsi;

pub use ema_atr::EmaAtr;
pub use rsi::Rsi;

use crate::engine::{AccountState, Candle, Signal};
use crate::errors::Result;

/// Fraction of equity requested by the built-in strategies on every entry.
pub const DEFAULT_SIZE: f64 = 0.02;

/// Longest indicator period a built-in strategy accepts.
pub const MAX_PERIOD: usize = 100_000;

/// The capability every strategy offers to the engine.
///
/// A strategy buffers every candle it receives and returns `Action::None` until
/// [`warmup`](Strategy::warmup) candles are buffered. It must be deterministic given
/// its buffer and parameters, and has no side effects beyond buffer growth.
pub trait Strategy: Send {
    /// Evaluates a new candle against the current account snapshot.
    fn on_candle(&mut self, candle: &Candle, account: &AccountState) -> Result<Signal>;

    /// Minimum number of buffered candles before signals are meaningful.
    fn warmup(&self) -> usize;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}

/// The closed set of strategies shipped with the crate.
#[derive(Debug, Clone)]
pub enum BuiltinStrategy {
    /// EMA crossover with ATR-based stops.
    EmaAtr(EmaAtr),
    /// RSI overbought/oversold thresholds.
    Rsi(Rsi),
}

impl Strategy for BuiltinStrategy {
    fn on_candle(&mut self, candle: &Candle, account: &AccountState) -> Result<Signal> {
        match self {
            Self::EmaAtr(s) => s.on_candle(candle, account),
            Self::Rsi(s) => s.on_candle(candle, account),
        }
    }

    fn warmup(&self) -> usize {
        match self {
            Self::EmaAtr(s) => s.warmup(),
            Self::Rsi(s) => s.warmup(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::EmaAtr(s) => s.name(),
            Self::Rsi(s) => s.name(),
        }
    }
}

impl From<EmaAtr> for BuiltinStrategy {
    fn from(value: EmaAtr) -> Self {
        Self::EmaAtr(value)
    }
}

impl From<Rsi> for BuiltinStrategy {
    fn from(value: Rsi) -> Self {
        Self::Rsi(value)
    }
}

/// Column helpers over a candle buffer.
pub(crate) fn closes(buffer: &[Candle]) -> Vec<f64> {
    buffer.iter().map(Candle::close).collect()
}

pub(crate) fn highs(buffer: &[Candle]) -> Vec<f64> {
    buffer.iter().map(Candle::high).collect()
}

pub(crate) fn lows(buffer: &[Candle]) -> Vec<f64> {
    buffer.iter().map(Candle::low).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::{DateTime, Duration};

    use crate::engine::{Candle, CandleBuilder};

    /// One candle per minute with open = high = low = close.
    pub fn flat_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                CandleBuilder::builder()
                    .symbol("BTCUSDT")
                    .timeframe("1m")
                    .open(close)
                    .high(close)
                    .low(close)
                    .close(close)
                    .volume(1.0)
                    .timestamp(DateTime::default() + Duration::minutes(i as i64))
                    .build()
                    .unwrap()
            })
            .collect()
    }
}
