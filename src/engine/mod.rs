//! Core execution components.
//!
//! This module provides the candle-driven paper execution engine:
//! - `Candle`: OHLCV bar fed to the engine.
//! - `Signal`: What a strategy wants on the current bar.
//! - `Position`: The single position owned by an engine.
//! - `AccountState`: Equity and position snapshot marked at the bar close.
//! - `TradeEvent`: Immutable record of every fill.

mod account;
mod candle;
mod event;
mod position;
mod signal;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    errors::{Error, Result},
    risk::RiskModel,
    strategies::Strategy,
    tradelog::TradeLogger,
};

pub(crate) use account::Account;
pub use account::AccountState;
pub use candle::*;
pub use event::*;
pub use position::*;
pub use signal::*;

/// Paper execution engine driving one strategy over a candle stream.
///
/// The engine exclusively owns its equity ledger and its single position. Every
/// candle goes through `strategy -> risk model -> naive fill at close`, and every
/// fill is reported to the notify callback, the trade log and the trade hook.
///
/// Candles must be fed one at a time in timestamp order; the engine has no
/// internal locking, so concurrent producers have to be serialized by the caller.
pub struct Engine {
    account: Account,
    position: Position,
    strategy: Option<Box<dyn Strategy>>,
    risk: Box<dyn RiskModel>,
    notify: Notify,
    hook: Option<TradeHook>,
    trades: Option<Arc<dyn TradeLogger>>,
    last_price: f64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("equity", &self.account.equity())
            .field("position", &self.position)
            .field("strategy", &self.strategy_name())
            .field("last_price", &self.last_price)
            .field("last_timestamp", &self.last_timestamp)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates a new engine.
    ///
    /// ### Arguments
    /// * `initial_equity` - Starting equity in quote currency.
    /// * `risk` - Risk model bounding every signal before execution.
    ///
    /// ### Returns
    /// The engine with no strategy attached, or `InvalidParameters` for a non-positive equity.
    ///
    /// ### Example
    /// ```rust
    /// use tradebot::prelude::*;
    ///
    /// let mut engine = Engine::new(10_000.0, RiskProfile::fixed_cap(0.02)).unwrap();
    /// engine.attach_strategy(EmaAtr::new(9, 21, 14, 1.5).unwrap());
    /// assert_eq!(engine.equity(), 10_000.0);
    /// assert!(engine.position().is_flat());
    /// ```
    pub fn new(initial_equity: f64, risk: impl RiskModel + 'static) -> Result<Self> {
        Ok(Self {
            account: Account::new(initial_equity)?,
            position: Position::default(),
            strategy: None,
            risk: Box::new(risk),
            notify: Box::new(|_| {}),
            hook: None,
            trades: None,
            last_price: 0.0,
            last_timestamp: None,
        })
    }

    /// Sets the callback receiving a human-readable line for every fill.
    pub fn with_notify<F>(mut self, notify: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.notify = Box::new(notify);
        self
    }

    /// Sets the callback receiving the structured record of every fill.
    pub fn with_trade_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&TradeEvent) + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Sets the durable trade log every fill is appended to.
    pub fn with_trade_log(mut self, trades: Arc<dyn TradeLogger>) -> Self {
        self.trades = Some(trades);
        self
    }

    /// Attaches (or replaces) the strategy.
    pub fn attach_strategy(&mut self, strategy: impl Strategy + 'static) {
        self.strategy = Some(Box::new(strategy));
    }

    /// Returns the name of the attached strategy.
    pub fn strategy_name(&self) -> Option<&str> {
        self.strategy.as_ref().map(|s| s.name())
    }

    /// Returns the realized equity.
    pub fn equity(&self) -> f64 {
        self.account.equity()
    }

    /// Returns the starting equity.
    pub fn initial_equity(&self) -> f64 {
        self.account.initial_equity()
    }

    /// Returns the open position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Returns the account state marked at the last processed close.
    pub fn snapshot(&self) -> AccountState {
        self.snapshot_at(self.last_price)
    }

    fn snapshot_at(&self, price: f64) -> AccountState {
        AccountState {
            equity: self.account.equity(),
            position: self.position,
            mark_price: price,
        }
    }

    /// Processes one candle.
    ///
    /// ### Arguments
    /// * `candle` - The next bar; its timestamp must be later than the previous one.
    ///
    /// ### Returns
    /// The fill produced by this candle, if any, or an error. On error the position,
    /// the equity and the last accepted timestamp and mark price are untouched; the
    /// strategy may still have buffered the candle.
    ///
    /// ### Example
    /// ```rust
    /// use tradebot::prelude::*;
    /// use chrono::DateTime;
    ///
    /// let mut engine = Engine::new(10_000.0, RiskProfile::fixed_cap(0.02)).unwrap();
    /// engine.attach_strategy(Rsi::new(14, 70.0, 30.0, 1.5).unwrap());
    ///
    /// let candle = CandleBuilder::builder()
    ///     .open(100.0)
    ///     .high(101.0)
    ///     .low(99.0)
    ///     .close(100.0)
    ///     .timestamp(DateTime::default())
    ///     .build()
    ///     .unwrap();
    ///
    /// // still warming up
    /// assert!(engine.on_candle(&candle).unwrap().is_none());
    /// ```
    pub fn on_candle(&mut self, candle: &Candle) -> Result<Option<TradeEvent>> {
        if self.strategy.is_none() {
            return Err(Error::NoStrategyAttached);
        }
        if let Some(last) = self.last_timestamp
            && candle.timestamp() <= last
        {
            return Err(Error::OutOfOrderCandle {
                last,
                got: candle.timestamp(),
            });
        }

        let price = candle.close();
        let account = self.snapshot_at(price);

        let signal = match self.strategy.as_mut() {
            Some(strategy) => strategy.on_candle(candle, &account)?,
            None => return Err(Error::NoStrategyAttached),
        };
        if signal.is_none() {
            self.accept(candle);
            return Ok(None);
        }
        tracing::debug!(action = ?signal.action, size = signal.size, comment = %signal.comment, "signal");

        let signal = self.risk.validate(signal, &account, price).inspect_err(|e| {
            tracing::warn!(symbol = candle.symbol(), error = %e, "signal rejected");
        })?;

        let event = match signal.action {
            Action::None => None,
            Action::Buy => self.fill(candle, &signal, PositionSide::Long)?,
            Action::Sell => self.fill(candle, &signal, PositionSide::Short)?,
            Action::Close => self.close(candle, &signal),
        };
        self.accept(candle);

        if let Some(event) = &event {
            self.emit(event, &signal);
        }
        Ok(event)
    }

    /// Marks `candle` as the last one processed.
    fn accept(&mut self, candle: &Candle) {
        self.last_price = candle.close();
        self.last_timestamp = Some(candle.timestamp());
    }

    /// Opens a flat engine or scales into a same-side position.
    fn fill(&mut self, candle: &Candle, signal: &Signal, side: PositionSide) -> Result<Option<TradeEvent>> {
        let kind = match self.position.side() {
            PositionSide::Flat => EventKind::Open,
            current if current == side => EventKind::Add,
            current => {
                tracing::debug!(held = ?current, wanted = ?side, "opposite signal while in position, ignored");
                return Ok(None);
            }
        };

        let price = candle.close();
        let quantity = self.account.size(signal.size) / price;
        if quantity <= 0.0 || !quantity.is_finite() {
            return Err(Error::RiskRejected(format!(
                "size {} of equity {} gives no tradable quantity",
                signal.size,
                self.account.equity()
            )));
        }

        match kind {
            EventKind::Add => self.position.scale_in(quantity, price),
            _ => self.position = Position::from((side, price, quantity)),
        }

        Ok(Some(TradeEvent {
            timestamp: candle.timestamp(),
            symbol: candle.symbol().to_owned(),
            timeframe: candle.timeframe().to_owned(),
            kind,
            side,
            quantity,
            price,
            pnl: 0.0,
            fee: 0.0,
            comment: signal.comment.clone(),
        }))
    }

    /// Realizes the open position at the candle close.
    fn close(&mut self, candle: &Candle, signal: &Signal) -> Option<TradeEvent> {
        if self.position.is_flat() {
            return None;
        }

        let price = candle.close();
        let closed = std::mem::take(&mut self.position);
        let pnl = closed.unrealized_pnl(price);
        self.account.realize(pnl);

        let comment = if signal.comment.is_empty() {
            "close".to_owned()
        } else {
            signal.comment.clone()
        };

        Some(TradeEvent {
            timestamp: candle.timestamp(),
            symbol: candle.symbol().to_owned(),
            timeframe: candle.timeframe().to_owned(),
            kind: EventKind::Close,
            side: closed.side(),
            quantity: closed.quantity(),
            price,
            pnl,
            fee: 0.0,
            comment,
        })
    }

    /// Reports a fill to the notify callback, the trade log and the trade hook.
    fn emit(&mut self, event: &TradeEvent, signal: &Signal) {
        tracing::info!(
            kind = %event.kind,
            side = event.side.label(),
            quantity = event.quantity,
            price = event.price,
            pnl = event.pnl,
            "fill"
        );

        (self.notify)(&describe(event, signal));

        if let Some(trades) = &self.trades
            && let Err(e) = trades.append(event.clone())
        {
            tracing::warn!(error = %e, "trade log append failed");
        }

        if let Some(hook) = self.hook.as_mut() {
            hook(event);
        }
    }
}

/// Formats the human-readable notification of a fill.
fn describe(event: &TradeEvent, signal: &Signal) -> String {
    let level = |price: Option<f64>| price.map_or_else(|| "-".to_owned(), |p| format!("{p:.2}"));
    match event.kind {
        EventKind::Close => format!("CLOSE @ {:.2} | PnL: {:.2} USD", event.price, event.pnl),
        kind => format!(
            "{} {} {:.4} @ {:.2} | TP:{} SL:{} {}",
            event.side.label(),
            kind.label().to_lowercase(),
            event.quantity,
            event.price,
            level(signal.take_profit),
            level(signal.stop_loss),
            signal.comment
        ),
    }
}
