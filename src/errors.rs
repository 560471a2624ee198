use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A candle arrived while the engine had no strategy attached.
    #[error("No strategy attached to the engine")]
    NoStrategyAttached,

    /// The strategy failed while evaluating a candle.
    #[error("Strategy error: {0}")]
    Strategy(String),

    /// The risk model refused the signal (e.g. non-positive size).
    #[error("Signal rejected by risk model: {0}")]
    RiskRejected(String),

    /// The history provider failed or returned no candles.
    #[error("History unavailable: {0}")]
    HistoryUnavailable(String),

    /// The backtest window or account parameters are malformed.
    #[error("Invalid run parameters: {0}")]
    InvalidRunParameters(String),

    /// A strategy, risk model or configuration value failed validation.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The candle timestamp does not advance past the last accepted one.
    #[error("Out of order candle: last accepted {last}, got {got}")]
    OutOfOrderCandle {
        /// Timestamp of the last accepted candle.
        last: DateTime<Utc>,
        /// Timestamp of the rejected candle.
        got: DateTime<Utc>,
    },

    /// The trade log store is unreadable or corrupted.
    #[error("Trade log error: {0}")]
    TradeLog(String),

    /// A shared lock was poisoned by a panicking holder.
    #[error("Mutex poisoned: {0}")]
    Mutex(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV encoding/decoding error occurred.
    // tradelog.rs
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML configuration could not be parsed.
    #[cfg(feature = "serde")]
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}
