//! # tradebot: candle-driven paper trading and backtesting
//!
//! **tradebot** runs a single trading strategy over a stream of candlestick (OHLCV) data.
//! The same engine serves two purposes: paper trading against a live or synthetic
//! feed, and replaying a historical window with fee accounting.
//!
//! ## How a candle is processed
//! 1. The attached [`Strategy`](strategies::Strategy) buffers the candle and proposes a [`Signal`](engine::Signal).
//! 2. A [`RiskModel`](risk::RiskModel) validates, resizes or rejects the signal.
//! 3. The [`Engine`](engine::Engine) fills it at the candle close:
//!    open when flat, scale in on the same side, realize on close.
//! 4. Every fill is reported to the notify callback, the trade log and the trade hook.
//!
//! ## Core Components
//! | Component   | Description                                                                                     |
//! |-------------|-------------------------------------------------------------------------------------------------|
//! | **`Candle`** | OHLCV bar for a symbol and timeframe, built with `CandleBuilder`.                             |
//! | **`Signal`** | Action (`none`, `buy`, `sell`, `close`), size as a fraction of equity, optional SL/TP.         |
//! | **`Engine`** | Owns one position and the equity ledger; fills signals at the close.                          |
//! | **`Strategy`** | `EmaAtr` crossover or `Rsi` thresholds, or your own implementation.                         |
//! | **`RiskProfile`** | Fixed cap, leverage scaling or pass-through.                                              |
//! | **`TradeLogger`** | Append-only trade record: CSV file or memory.                                            |
//! | **`Backtest`** | Historical replay with taker fees, an equity curve and a `Summary`.                         |
//!
//! ## Strategies
//! | Strategy | Buy | Sell | Stop-loss |
//! |----------|-----|------|-----------|
//! | **EMA/ATR** | fast EMA crosses above slow EMA | fast EMA crosses below slow EMA | 1.5 × ATR from the close |
//! | **RSI** | RSI ≤ oversold | RSI ≥ overbought | 1% from the close |
//!
//! Take-profit sits at `R` times the stop distance on the other side of the close.
//!
//! ## Getting Started
//! ```rust
//! use tradebot::prelude::*;
//! use chrono::{DateTime, Duration};
//!
//! let mut engine = Engine::new(10_000.0, RiskProfile::fixed_cap(0.02))
//!     .unwrap()
//!     .with_notify(|msg| println!("{msg}"));
//! engine.attach_strategy(Rsi::new(14, 70.0, 30.0, 1.5).unwrap());
//!
//! // a steady decline drives the RSI to zero
//! for i in 0..20 {
//!     let close = 200.0 - i as f64;
//!     let candle = CandleBuilder::builder()
//!         .symbol("BTCUSDT")
//!         .timeframe("1m")
//!         .open(close + 1.0)
//!         .high(close + 1.0)
//!         .low(close)
//!         .close(close)
//!         .timestamp(DateTime::default() + Duration::minutes(i))
//!         .build()
//!         .unwrap();
//!     engine.on_candle(&candle).unwrap();
//! }
//!
//! assert_eq!(engine.position().side(), PositionSide::Long);
//! ```
//!
//! ## Backtesting
//! ```rust
//! use tradebot::prelude::*;
//! use chrono::{DateTime, Duration};
//!
//! let start = DateTime::default();
//! let candles = RandomFeed::new("BTCUSDT", "1m", start, 64_000.0, 0.002, Some(42))
//!     .unwrap()
//!     .take(500)
//!     .collect::<Vec<_>>();
//!
//! let params = BacktestParams {
//!     symbol: "BTCUSDT".to_owned(),
//!     timeframe: "1m".to_owned(),
//!     from: start,
//!     to: start + Duration::days(1),
//!     initial_equity: 10_000.0,
//!     leverage: 1.0,
//!     slippage_bps: 0.0,
//!     fees: FeesConfig { maker_bps: 2.0, taker_bps: 5.0 },
//!     venue: Venue::Spot,
//!     strategy: StrategyConfig::default(),
//! };
//!
//! let report = Backtest::new(params).unwrap().run(&InMemoryHistory::new(candles)).unwrap();
//! println!("{}", report.summary);
//! ```
//!
//! ## Features
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` (default) | Serialize types, TOML settings, JSON history files, loose parameter maps. |
//! | `cli` (default) | The `tradebot` paper-trading binary. |
//!
//! ## Error Handling
//! Every fallible operation returns [`errors::Result`]. Nothing in the library panics on
//! bad input: a missing strategy, a rejected signal, an out-of-order candle or an empty
//! history are all reported as [`errors::Error`] variants.
#![warn(missing_docs)]

/// Core execution components: candles, signals, positions and the engine.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Technical indicators: EMA, true range, ATR, RSI.
pub mod indicators;

/// Trading strategies and the strategy capability.
pub mod strategies;

/// Risk models validating signals before execution.
pub mod risk;

/// Trade log stores.
pub mod tradelog;

/// Historical replay with fee accounting.
pub mod backtest;

/// Performance metrics: P&L, win rate, profit factor, drawdown.
pub mod metrics;

/// Settings and strategy configuration.
pub mod config;

/// Candle feeds and the paper session loop.
pub mod feed;

/// Utility functions and helpers.
pub mod utils;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::Percent;
    pub use crate::backtest::*;
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::feed::*;
    pub use crate::metrics::*;
    pub use crate::risk::*;
    pub use crate::strategies::*;
    pub use crate::tradelog::*;
}

/// Percent and basis-point arithmetic on prices and equity.
///
/// Stop levels are placed a percentage away from a close, fees are quoted in
/// basis points and returns are reported as a percentage of the starting equity.
pub trait Percent: Sized {
    /// Moves the value up by `pct` percent: `100.0.up_pct(1.0) == 101.0`.
    fn up_pct(self, pct: Self) -> Self;

    /// Moves the value down by `pct` percent: `100.0.down_pct(1.0) == 99.0`.
    fn down_pct(self, pct: Self) -> Self;

    /// Percentage move from `self` to `to`.
    fn pct_to(self, to: Self) -> Self;

    /// Converts basis points into a fraction: `5.0.bps() == 0.0005`.
    fn bps(self) -> Self;
}

impl Percent for f64 {
    fn up_pct(self, pct: f64) -> f64 {
        self * (1.0 + pct / 100.0)
    }

    fn down_pct(self, pct: f64) -> f64 {
        self * (1.0 - pct / 100.0)
    }

    fn pct_to(self, to: f64) -> f64 {
        (to - self) / self * 100.0
    }

    fn bps(self) -> f64 {
        self / 10_000.0
    }
}
