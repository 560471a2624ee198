//! Property tests for the engine, the strategies and the metrics.
//!
//! Uses proptest to verify:
//! 1. Warm-up silence: no strategy signals before its warm-up is buffered
//! 2. Scale-in: the entry price is the quantity-weighted average of the fills
//! 3. Round trip: opening and closing at the same price realizes nothing
//! 4. Profit factor: zero, never infinite, when no trade lost
//! 5. Drawdown: never positive, zero on a non-decreasing curve

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use tradebot::backtest::{EquityPoint, Trade};
use tradebot::engine::{AccountState, Action, Candle, CandleBuilder, Engine, EventKind, Signal};
use tradebot::metrics::{Summary, max_drawdown};
use tradebot::risk::RiskProfile;
use tradebot::strategies::{EmaAtr, Rsi, Strategy as TradingStrategy};

fn candle(index: usize, close: f64) -> Candle {
    CandleBuilder::builder()
        .symbol("BTCUSDT")
        .timeframe("1m")
        .open(close)
        .high(close)
        .low(close)
        .close(close)
        .timestamp(DateTime::<Utc>::default() + Duration::minutes(index as i64))
        .build()
        .unwrap()
}

struct Scripted(VecDeque<Signal>);

impl TradingStrategy for Scripted {
    fn on_candle(&mut self, _candle: &Candle, _account: &AccountState) -> tradebot::errors::Result<Signal> {
        Ok(self.0.pop_front().unwrap_or_default())
    }

    fn warmup(&self) -> usize {
        0
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn scripted(signals: Vec<Signal>) -> Scripted {
    Scripted(signals.into())
}

fn trade(pnl: f64) -> Trade {
    Trade {
        timestamp: DateTime::default(),
        kind: EventKind::Close,
        side: "long".to_owned(),
        quantity: 1.0,
        price: 100.0,
        pnl,
        fee: 0.0,
        note: String::new(),
    }
}

fn curve(values: &[f64]) -> Vec<EquityPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &equity)| EquityPoint {
            timestamp: DateTime::<Utc>::default() + Duration::minutes(i as i64),
            equity,
        })
        .collect()
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_fraction() -> impl Strategy<Value = f64> {
    (0.001..0.5_f64).prop_map(|f| (f * 1000.0).round() / 1000.0)
}

fn arb_equity() -> impl Strategy<Value = f64> {
    1_000.0..1_000_000.0_f64
}

// ── 1. Warm-up silence ───────────────────────────────────────────────

proptest! {
    /// EMA/ATR stays silent until `max(fast, slow, atr) + 2` candles are buffered.
    #[test]
    fn ema_atr_silent_during_warmup(
        fast in 1usize..30,
        slow in 1usize..30,
        atr in 1usize..30,
        closes in prop::collection::vec(arb_price(), 0..40),
    ) {
        let mut strategy = EmaAtr::new(fast, slow, atr, 1.5).unwrap();
        let warmup = strategy.warmup();
        for (i, &close) in closes.iter().take(warmup - 1).enumerate() {
            let signal = strategy.on_candle(&candle(i, close), &AccountState::default()).unwrap();
            prop_assert!(signal.is_none());
        }
    }

    /// RSI stays silent until `len + 2` candles are buffered.
    #[test]
    fn rsi_silent_during_warmup(
        len in 2usize..30,
        closes in prop::collection::vec(arb_price(), 0..40),
    ) {
        let mut strategy = Rsi::new(len, 70.0, 30.0, 1.5).unwrap();
        let warmup = strategy.warmup();
        for (i, &close) in closes.iter().take(warmup - 1).enumerate() {
            let signal = strategy.on_candle(&candle(i, close), &AccountState::default()).unwrap();
            prop_assert!(signal.is_none());
        }
    }
}

// ── 2. Scale-in weighted average ─────────────────────────────────────

proptest! {
    /// After N same-side fills the entry is Σ(p·q) / Σq.
    #[test]
    fn scale_in_weighted_average(
        equity in arb_equity(),
        fills in prop::collection::vec((arb_price(), arb_fraction()), 1..10),
        short in any::<bool>(),
    ) {
        let action = if short { Action::Sell } else { Action::Buy };
        let signals = fills.iter().map(|&(_, size)| Signal::from((action, size))).collect();
        let mut engine = Engine::new(equity, RiskProfile::PassThrough).unwrap();
        engine.attach_strategy(scripted(signals));

        let (mut notional, mut quantity) = (0.0, 0.0);
        for (i, &(price, size)) in fills.iter().enumerate() {
            let event = engine.on_candle(&candle(i, price)).unwrap().unwrap();
            let expected_kind = if i == 0 { EventKind::Open } else { EventKind::Add };
            prop_assert_eq!(event.kind, expected_kind);

            let q = equity * size / price;
            notional += price * q;
            quantity += q;
        }

        let position = engine.position();
        prop_assert!((position.quantity() - quantity).abs() <= 1e-9 * quantity);
        prop_assert!((position.entry_price() - notional / quantity).abs() <= 1e-9 * position.entry_price());
        prop_assert_eq!(engine.equity(), equity);
    }
}

// ── 3. Round trip ────────────────────────────────────────────────────

proptest! {
    /// Opening then closing at the same price realizes zero and returns to flat.
    #[test]
    fn round_trip_at_same_price(
        equity in arb_equity(),
        price in arb_price(),
        size in arb_fraction(),
        short in any::<bool>(),
    ) {
        let action = if short { Action::Sell } else { Action::Buy };
        let mut engine = Engine::new(equity, RiskProfile::PassThrough).unwrap();
        engine.attach_strategy(scripted(vec![(action, size).into(), Signal::close("")]));

        engine.on_candle(&candle(0, price)).unwrap();
        let event = engine.on_candle(&candle(1, price)).unwrap().unwrap();

        prop_assert_eq!(event.kind, EventKind::Close);
        prop_assert_eq!(event.pnl, 0.0);
        prop_assert!(engine.position().is_flat());
        prop_assert_eq!(engine.equity(), equity);
    }
}

// ── 4. Profit factor ─────────────────────────────────────────────────

proptest! {
    /// No losing trade means a profit factor of exactly zero.
    #[test]
    fn profit_factor_zero_without_losses(
        wins in prop::collection::vec(0.01..1_000.0_f64, 1..20),
        flats in 0usize..5,
    ) {
        let trades = wins
            .iter()
            .map(|&pnl| trade(pnl))
            .chain((0..flats).map(|_| trade(0.0)))
            .collect::<Vec<_>>();
        let summary = Summary::compute(&[], &trades);

        prop_assert_eq!(summary.profit_factor, 0.0);
        prop_assert_eq!(summary.trades, wins.len() + flats);
        prop_assert!(summary.win_rate > 0.0 && summary.win_rate <= 1.0);
    }
}

// ── 5. Drawdown ──────────────────────────────────────────────────────

proptest! {
    /// The drawdown is never positive.
    #[test]
    fn drawdown_never_positive(values in prop::collection::vec(1.0..100_000.0_f64, 0..50)) {
        prop_assert!(max_drawdown(&curve(&values)) <= 0.0);
    }

    /// A non-decreasing curve has no drawdown.
    #[test]
    fn drawdown_zero_when_non_decreasing(mut values in prop::collection::vec(1.0..100_000.0_f64, 0..50)) {
        values.sort_by(f64::total_cmp);
        prop_assert_eq!(max_drawdown(&curve(&values)), 0.0);
    }
}
