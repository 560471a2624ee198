use chrono::{DateTime, Duration, Utc};

#[cfg(feature = "serde")]
use chrono::serde::ts_milliseconds;
#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::engine::{Candle, CandleBuilder};
use crate::errors::{Error, Result};

/// One exchange kline as found in JSON history dumps.
///
/// Accepts both short (`open`, `close`) and long (`open_price`, `close_price`) field
/// names; `open_time` is in epoch milliseconds and `volume` may be absent. Extra
/// fields such as `close_time` or `number_of_trades` are ignored.
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[derive(Debug, Clone)]
pub(crate) struct Kline {
    #[cfg_attr(feature = "serde", serde(alias = "open_price"))]
    open: f64,
    #[cfg_attr(feature = "serde", serde(alias = "high_price"))]
    high: f64,
    #[cfg_attr(feature = "serde", serde(alias = "low_price"))]
    low: f64,
    #[cfg_attr(feature = "serde", serde(alias = "close_price"))]
    close: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    volume: f64,
    #[cfg_attr(feature = "serde", serde(with = "ts_milliseconds"))]
    open_time: DateTime<Utc>,
}

impl Kline {
    pub(crate) fn open_time(&self) -> DateTime<Utc> {
        self.open_time
    }

    /// Validates the kline into a candle of `symbol`/`timeframe`.
    pub(crate) fn to_candle(&self, symbol: &str, timeframe: &str) -> Result<Candle> {
        CandleBuilder::builder()
            .symbol(symbol)
            .timeframe(timeframe)
            .open(self.open)
            .high(self.high)
            .low(self.low)
            .close(self.close)
            .volume(self.volume)
            .timestamp(self.open_time)
            .build()
    }
}

#[cfg(feature = "serde")]
/// Reads klines from the JSON array at `filepath`.
pub(crate) fn read_klines(filepath: &std::path::Path) -> Result<Vec<Kline>> {
    use std::{fs::File, io::BufReader};

    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(Error::from)
}

/// Parses a timeframe label (`30s`, `1m`, `15m`, `1h`, `4h`, `1d`, `1w`) into its duration.
pub fn timeframe_duration(timeframe: &str) -> Result<Duration> {
    let invalid = || Error::InvalidParameters(format!("unknown timeframe `{timeframe}`"));

    let split = timeframe.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
    let (count, unit) = timeframe.split_at(split);
    let count = count.parse::<i64>().map_err(|_| invalid())?;
    if count <= 0 {
        return Err(invalid());
    }

    match unit {
        "s" => Ok(Duration::seconds(count)),
        "m" => Ok(Duration::minutes(count)),
        "h" => Ok(Duration::hours(count)),
        "d" => Ok(Duration::days(count)),
        "w" => Ok(Duration::weeks(count)),
        _ => Err(invalid()),
    }
}
