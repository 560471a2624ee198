use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// One OHLCV bar of a `symbol`/`timeframe` stream.
///
/// Candles are immutable once built; use [`CandleBuilder`] to create one.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    symbol: String,
    timeframe: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    timestamp: DateTime<Utc>,
}

impl Candle {
    /// Returns the traded symbol (e.g. `BTCUSDT`).
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the bar interval (e.g. `1m`).
    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    /// Returns the open price.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Returns the high price.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns the low price.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Returns the close price.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Returns the traded volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Returns the bar open timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Step-by-step constructor for [`Candle`].
///
/// ### Example
/// ```rust
/// use tradebot::prelude::*;
/// use chrono::DateTime;
///
/// let candle = CandleBuilder::builder()
///     .symbol("BTCUSDT")
///     .timeframe("1m")
///     .open(100.0)
///     .high(110.0)
///     .low(95.0)
///     .close(105.0)
///     .volume(1.0)
///     .timestamp(DateTime::default())
///     .build()
///     .unwrap();
/// assert_eq!(candle.close(), 105.0);
/// ```
#[derive(Debug, Default)]
pub struct CandleBuilder {
    symbol: Option<String>,
    timeframe: Option<String>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    timestamp: Option<DateTime<Utc>>,
}

impl CandleBuilder {
    /// Starts an empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the symbol.
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Sets the timeframe.
    pub fn timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.timeframe = Some(timeframe.into());
        self
    }

    /// Sets the open price.
    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the high price.
    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the low price.
    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the close price.
    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Sets the volume.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Sets the bar timestamp.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Validates the prices and builds the candle.
    ///
    /// Symbol and timeframe default to empty strings, volume to `0.0`.
    ///
    /// ### Returns
    /// The candle, or `InvalidParameters` when a price is missing, not positive,
    /// or the high/low range does not contain open and close.
    pub fn build(self) -> Result<Candle> {
        let field = |value: Option<f64>, name: &str| {
            value.ok_or_else(|| Error::InvalidParameters(format!("candle {name} is missing")))
        };
        let open = field(self.open, "open")?;
        let high = field(self.high, "high")?;
        let low = field(self.low, "low")?;
        let close = field(self.close, "close")?;
        let volume = self.volume.unwrap_or(0.0);

        for (name, price) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            if price <= 0.0 || !price.is_finite() {
                return Err(Error::InvalidParameters(format!("candle {name} must be positive (got: {price})")));
            }
        }
        if high < open.max(close) || low > open.min(close) {
            return Err(Error::InvalidParameters(format!(
                "candle range [{low}, {high}] does not contain open {open} and close {close}"
            )));
        }
        if volume < 0.0 || !volume.is_finite() {
            return Err(Error::InvalidParameters(format!("candle volume must be non-negative (got: {volume})")));
        }

        Ok(Candle {
            symbol: self.symbol.unwrap_or_default(),
            timeframe: self.timeframe.unwrap_or_default(),
            open,
            high,
            low,
            close,
            volume,
            timestamp: self.timestamp.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
#[test]
fn build_valid_candle() {
    let candle = CandleBuilder::builder()
        .symbol("ETHUSDT")
        .timeframe("5m")
        .open(100.0)
        .high(111.0)
        .low(99.0)
        .close(110.0)
        .volume(3.5)
        .build()
        .unwrap();

    assert_eq!(candle.symbol(), "ETHUSDT");
    assert_eq!(candle.timeframe(), "5m");
    assert_eq!(candle.high(), 111.0);
    assert_eq!(candle.volume(), 3.5);
}

#[cfg(test)]
#[test]
fn build_missing_price() {
    let result = CandleBuilder::builder().open(100.0).high(101.0).low(99.0).build();
    assert!(matches!(result, Err(Error::InvalidParameters(_))));
}

#[cfg(test)]
#[test]
fn build_inverted_range() {
    let result = CandleBuilder::builder()
        .open(100.0)
        .high(99.0)
        .low(98.0)
        .close(100.0)
        .build();
    assert!(matches!(result, Err(Error::InvalidParameters(_))));
}

#[cfg(test)]
#[test]
fn build_non_positive_price() {
    let result = CandleBuilder::builder()
        .open(0.0)
        .high(1.0)
        .low(0.0)
        .close(1.0)
        .build();
    assert!(matches!(result, Err(Error::InvalidParameters(_))));
}
