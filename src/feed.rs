//! Candle sources for paper trading.
//!
//! [`RandomFeed`] is a seeded random walk usable as an endless candle iterator, and
//! [`run_paper`] drives one engine from any candle source, including the receiving
//! end of a channel shared by several producer threads.

use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::{Candle, CandleBuilder, Engine};
use crate::errors::{Error, Result};
use crate::utils::timeframe_duration;

/// Random-walk candle generator.
///
/// Every candle opens at the previous close and closes within `±volatility` of it.
/// Wicks extend up to half the volatility beyond the body.
#[derive(Debug, Clone)]
pub struct RandomFeed {
    symbol: String,
    timeframe: String,
    step: Duration,
    next_timestamp: DateTime<Utc>,
    price: f64,
    volatility: f64,
    rng: StdRng,
}

impl RandomFeed {
    /// Creates a feed.
    ///
    /// ### Arguments
    /// * `symbol` - Symbol stamped on every candle.
    /// * `timeframe` - Timeframe label, also the spacing of timestamps.
    /// * `start` - Timestamp of the first candle.
    /// * `start_price` - Open of the first candle.
    /// * `volatility` - Largest relative close-to-open move, in `[0, 1)`.
    /// * `seed` - Generator seed; `None` seeds from the OS.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        start: DateTime<Utc>,
        start_price: f64,
        volatility: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        let timeframe = timeframe.into();
        if start_price <= 0.0 || !start_price.is_finite() {
            return Err(Error::InvalidParameters(format!(
                "start price must be positive (got: {start_price})"
            )));
        }
        if !(0.0..1.0).contains(&volatility) {
            return Err(Error::InvalidParameters(format!(
                "volatility must be in [0, 1) (got: {volatility})"
            )));
        }

        Ok(Self {
            symbol: symbol.into(),
            step: timeframe_duration(&timeframe)?,
            timeframe,
            next_timestamp: start,
            price: start_price,
            volatility,
            rng: seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64),
        })
    }

    /// Generates the next candle and advances the walk.
    pub fn next_candle(&mut self) -> Result<Candle> {
        let open = self.price;
        let ret = (self.rng.random::<f64>() - 0.5) * 2.0 * self.volatility;
        let close = open * (1.0 + ret);
        let high = open.max(close) * (1.0 + self.rng.random::<f64>() * self.volatility * 0.5);
        let low = open.min(close) * (1.0 - self.rng.random::<f64>() * self.volatility * 0.5);
        let volume = 10_000.0 + self.rng.random::<f64>() * 5_000.0;

        let candle = CandleBuilder::builder()
            .symbol(self.symbol.as_str())
            .timeframe(self.timeframe.as_str())
            .open(open)
            .high(high)
            .low(low)
            .close(close)
            .volume(volume)
            .timestamp(self.next_timestamp)
            .build()?;

        self.price = close;
        self.next_timestamp += self.step;
        Ok(candle)
    }

    /// Moves `count` candles into `sender` from a new thread, sleeping `pace` between them.
    ///
    /// The thread stops early when the receiving side is dropped.
    pub fn spawn(mut self, count: usize, pace: StdDuration, sender: Sender<Candle>) -> JoinHandle<()> {
        thread::spawn(move || {
            for _ in 0..count {
                let candle = match self.next_candle() {
                    Ok(candle) => candle,
                    Err(e) => {
                        tracing::warn!(error = %e, "random feed stopped");
                        return;
                    }
                };
                if sender.send(candle).is_err() {
                    tracing::debug!(symbol = %self.symbol, "candle receiver closed");
                    return;
                }
                if !pace.is_zero() {
                    thread::sleep(pace);
                }
            }
        })
    }
}

impl Iterator for RandomFeed {
    type Item = Candle;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_candle()
            .inspect_err(|e| tracing::warn!(error = %e, "random feed stopped"))
            .ok()
    }
}

/// Counters of a paper session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaperStats {
    /// Candles received.
    pub candles: usize,
    /// Candles that produced a fill.
    pub fills: usize,
    /// Candles whose processing failed.
    pub errors: usize,
}

/// Feeds every candle of `source` to `engine` until the source ends.
///
/// Per-candle errors are logged and the session moves on to the next candle; the
/// engine is never torn down.
pub fn run_paper<I>(engine: &mut Engine, source: I) -> PaperStats
where
    I: IntoIterator<Item = Candle>,
{
    let mut stats = PaperStats::default();
    for candle in source {
        stats.candles += 1;
        match engine.on_candle(&candle) {
            Ok(Some(_)) => stats.fills += 1,
            Ok(None) => {}
            Err(e) => {
                stats.errors += 1;
                tracing::warn!(symbol = candle.symbol(), ts = %candle.timestamp(), error = %e, "candle skipped");
            }
        }
    }
    tracing::info!(candles = stats.candles, fills = stats.fills, errors = stats.errors, "paper session ended");
    stats
}
