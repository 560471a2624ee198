//! Historical replay with fee accounting.
//!
//! A [`Backtest`] fetches a bounded window of candles from a [`HistoryProvider`],
//! replays it through one [`Engine`] configured with a leverage-aware risk model, and
//! books taker fees through the engine's trade hook. The engine's own ledger stays
//! fee-exclusive; fees only show up in the recorded trades and the equity curve.

#[cfg(feature = "serde")]
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Percent;
use crate::config::StrategyConfig;
use crate::engine::{Candle, Engine, EventKind, PositionSide, TradeEvent};
use crate::errors::{Error, Result};
use crate::metrics::Summary;
use crate::risk::RiskProfile;
use crate::strategies::Strategy;

/// Exchange market the history comes from.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Venue {
    /// Spot market.
    #[default]
    Spot,
    /// Perpetual futures market.
    Futures,
}

/// Fee schedule in basis points. Only the taker rate is charged.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeesConfig {
    /// Maker fee.
    pub maker_bps: f64,
    /// Taker fee, applied to every fill.
    pub taker_bps: f64,
}

impl FeesConfig {
    /// Fraction of notional charged per fill, never negative.
    pub fn taker_rate(&self) -> f64 {
        self.taker_bps.bps().max(0.0)
    }
}

/// Parameters of one backtest run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestParams {
    /// Traded symbol.
    pub symbol: String,
    /// Candle timeframe.
    pub timeframe: String,
    /// Start of the window (inclusive).
    pub from: DateTime<Utc>,
    /// End of the window (exclusive).
    pub to: DateTime<Utc>,
    /// Starting equity.
    pub initial_equity: f64,
    /// Size multiplier; `<= 1` leaves sizes untouched.
    pub leverage: f64,
    /// Carried for reporting, not applied to fills.
    pub slippage_bps: f64,
    /// Fee schedule.
    pub fees: FeesConfig,
    /// Market of the history.
    pub venue: Venue,
    /// Strategy to replay.
    pub strategy: StrategyConfig,
}

/// Window requested from a [`HistoryProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRequest {
    /// Symbol.
    pub symbol: String,
    /// Timeframe.
    pub timeframe: String,
    /// Start of the window (inclusive).
    pub from: DateTime<Utc>,
    /// End of the window (exclusive).
    pub to: DateTime<Utc>,
    /// Market.
    pub venue: Venue,
}

impl HistoryRequest {
    fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.from <= timestamp && timestamp < self.to
    }
}

impl From<&BacktestParams> for HistoryRequest {
    fn from(value: &BacktestParams) -> Self {
        Self {
            symbol: value.symbol.clone(),
            timeframe: value.timeframe.clone(),
            from: value.from,
            to: value.to,
            venue: value.venue,
        }
    }
}

/// Supplies a finite, time-ordered candle sequence for a window.
pub trait HistoryProvider {
    /// Fetches the candles of `request`.
    fn fetch(&self, request: &HistoryRequest) -> Result<Vec<Candle>>;
}

/// Provider over candles already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    candles: Vec<Candle>,
}

impl InMemoryHistory {
    /// Wraps a candle list.
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles }
    }
}

impl From<Vec<Candle>> for InMemoryHistory {
    fn from(value: Vec<Candle>) -> Self {
        Self::new(value)
    }
}

impl HistoryProvider for InMemoryHistory {
    fn fetch(&self, request: &HistoryRequest) -> Result<Vec<Candle>> {
        Ok(self
            .candles
            .iter()
            .filter(|c| request.contains(c.timestamp()))
            .cloned()
            .collect())
    }
}

/// Provider reading a JSON array of exchange klines from disk.
///
/// Fields may use either the short (`open`) or long (`open_price`) names, and
/// `open_time` is in milliseconds. The venue of the request is ignored.
#[cfg(feature = "serde")]
#[derive(Debug, Clone)]
pub struct JsonFileHistory {
    path: PathBuf,
}

#[cfg(feature = "serde")]
impl JsonFileHistory {
    /// Points the provider at a file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(feature = "serde")]
impl HistoryProvider for JsonFileHistory {
    fn fetch(&self, request: &HistoryRequest) -> Result<Vec<Candle>> {
        crate::utils::read_klines(&self.path)?
            .iter()
            .filter(|k| request.contains(k.open_time()))
            .map(|k| k.to_candle(&request.symbol, &request.timeframe))
            .collect()
    }
}

/// One row of the backtest trade list.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    /// Candle timestamp of the fill.
    #[cfg_attr(feature = "serde", serde(rename = "ts"))]
    pub timestamp: DateTime<Utc>,
    /// Fill kind.
    #[cfg_attr(feature = "serde", serde(rename = "event"))]
    pub kind: EventKind,
    /// `long`, `short` or `flat`.
    pub side: String,
    /// Filled quantity.
    #[cfg_attr(feature = "serde", serde(rename = "qty"))]
    pub quantity: f64,
    /// Fill price.
    pub price: f64,
    /// Net realized P&L on closes, zero otherwise.
    pub pnl: f64,
    /// Fee of the fill; on closes, the fee of the whole round trip.
    pub fee: f64,
    /// Comment of the signal.
    pub note: String,
}

/// Fee-inclusive equity after a candle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    /// Candle timestamp.
    #[cfg_attr(feature = "serde", serde(rename = "ts"))]
    pub timestamp: DateTime<Utc>,
    /// Engine equity minus every fee paid so far.
    #[cfg_attr(feature = "serde", serde(rename = "eq"))]
    pub equity: f64,
}

/// Outcome of a backtest.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    /// Every fill, in order.
    pub trades: Vec<Trade>,
    /// One point for the start plus one per candle.
    #[cfg_attr(feature = "serde", serde(rename = "equity"))]
    pub equity_curve: Vec<EquityPoint>,
    /// Metrics over the closes and the curve.
    pub summary: Summary,
}

/// Fee accumulator fed by the engine's trade hook.
#[derive(Debug, Default)]
struct FeeLedger {
    rate: f64,
    round_trip: f64,
    total: f64,
    trades: Vec<Trade>,
}

impl FeeLedger {
    fn new(rate: f64) -> Self {
        Self {
            rate,
            ..Self::default()
        }
    }

    fn record(&mut self, event: &TradeEvent) {
        if event.quantity <= 0.0 || event.price <= 0.0 {
            return;
        }
        let fee = (event.price * event.quantity * self.rate).max(0.0);
        self.total += fee;

        let (pnl, fee) = match event.kind {
            EventKind::Open | EventKind::Add => {
                self.round_trip += fee;
                (0.0, fee)
            }
            EventKind::Close => {
                let round_trip = std::mem::take(&mut self.round_trip) + fee;
                (event.pnl - round_trip, round_trip)
            }
        };

        self.trades.push(Trade {
            timestamp: event.timestamp,
            kind: event.kind,
            side: side_name(event.side).to_owned(),
            quantity: event.quantity,
            price: event.price,
            pnl,
            fee,
            note: event.comment.clone(),
        });
    }
}

fn side_name(side: PositionSide) -> &'static str {
    match side {
        PositionSide::Long => "long",
        PositionSide::Short => "short",
        PositionSide::Flat => "flat",
    }
}

/// A validated backtest, ready to run against a history provider.
#[derive(Debug, Clone)]
pub struct Backtest {
    params: BacktestParams,
}

impl Backtest {
    /// Validates the run parameters.
    ///
    /// ### Returns
    /// `InvalidRunParameters` when the window is empty or reversed, the equity is not
    /// positive, or the leverage is not a positive number.
    pub fn new(params: BacktestParams) -> Result<Self> {
        if params.from >= params.to {
            return Err(Error::InvalidRunParameters(format!(
                "empty window: {} >= {}",
                params.from, params.to
            )));
        }
        if params.initial_equity <= 0.0 || !params.initial_equity.is_finite() {
            return Err(Error::InvalidRunParameters(format!(
                "initial equity must be positive (got: {})",
                params.initial_equity
            )));
        }
        if params.leverage <= 0.0 || !params.leverage.is_finite() {
            return Err(Error::InvalidRunParameters(format!(
                "leverage must be positive (got: {})",
                params.leverage
            )));
        }
        Ok(Self { params })
    }

    /// Returns the parameters.
    pub fn params(&self) -> &BacktestParams {
        &self.params
    }

    /// Fetches the history and replays it with the configured strategy.
    ///
    /// ### Returns
    /// The report, `HistoryUnavailable` when the fetch fails or yields nothing, or the
    /// first candle-processing error. Partial results are never returned.
    pub fn run(&self, provider: &dyn HistoryProvider) -> Result<BacktestReport> {
        let request = HistoryRequest::from(&self.params);
        let candles = provider.fetch(&request).map_err(|e| match e {
            Error::HistoryUnavailable(_) => e,
            other => Error::HistoryUnavailable(other.to_string()),
        })?;
        let strategy = self.params.strategy.build()?;
        self.replay(&candles, strategy)
    }

    /// Replays `candles` with an explicit strategy.
    pub fn replay(&self, candles: &[Candle], strategy: impl Strategy + 'static) -> Result<BacktestReport> {
        let Some(first) = candles.first() else {
            return Err(Error::HistoryUnavailable(format!(
                "no candles for {} {} in [{}, {})",
                self.params.symbol, self.params.timeframe, self.params.from, self.params.to
            )));
        };
        tracing::info!(
            symbol = %self.params.symbol,
            timeframe = %self.params.timeframe,
            candles = candles.len(),
            strategy = strategy.name(),
            "backtest started"
        );

        let ledger = Arc::new(Mutex::new(FeeLedger::new(self.params.fees.taker_rate())));
        let hook_ledger = Arc::clone(&ledger);
        let mut engine = Engine::new(self.params.initial_equity, RiskProfile::leveraged(self.params.leverage))?
            .with_trade_hook(move |event| {
                if let Ok(mut ledger) = hook_ledger.lock() {
                    ledger.record(event);
                }
            });
        engine.attach_strategy(strategy);

        let mut equity_curve = Vec::with_capacity(candles.len() + 1);
        equity_curve.push(EquityPoint {
            timestamp: first.timestamp(),
            equity: self.params.initial_equity,
        });

        for candle in candles {
            engine.on_candle(candle)?;
            let fees = ledger.lock().map_err(|e| Error::Mutex(e.to_string()))?.total;
            equity_curve.push(EquityPoint {
                timestamp: candle.timestamp(),
                equity: engine.equity() - fees,
            });
        }

        let trades = std::mem::take(&mut ledger.lock().map_err(|e| Error::Mutex(e.to_string()))?.trades);
        let summary = Summary::compute(&equity_curve, &trades);
        tracing::info!(
            pnl = summary.pnl,
            trades = summary.trades,
            win_rate = summary.win_rate,
            max_drawdown = summary.max_drawdown,
            "backtest finished"
        );

        Ok(BacktestReport {
            trades,
            equity_curve,
            summary,
        })
    }
}
