//! Performance metrics for backtesting.
//!
//! This module provides a pure reducer over a backtest's trades and equity curve:
//! - Total P&L
//! - Win rate
//! - Profit factor
//! - Max drawdown
//!
//! Only `CLOSE` trades are counted; open and add fills carry no realized P&L.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::backtest::{EquityPoint, Trade};
use crate::engine::EventKind;

/// Aggregate of a closed-trade list and an equity curve.
///
/// Derived on demand with [`Summary::compute`], never mutated in place.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    /// Sum of realized (net) P&L over closes.
    pub pnl: f64,
    /// Number of closes.
    pub trades: usize,
    /// Fraction of closes with a strictly positive P&L, in `[0, 1]`.
    pub win_rate: f64,
    /// Gross gains over gross losses; zero when no loss was recorded.
    pub profit_factor: f64,
    /// Most negative peak-to-trough move of the equity curve, in percent (`<= 0`).
    pub max_drawdown: f64,
}

impl Summary {
    /// Computes the summary.
    ///
    /// ### Arguments
    /// * `equity` - Equity curve; the first point seeds the running peak.
    /// * `trades` - Trade list; non-`CLOSE` rows are ignored.
    ///
    /// ### Example
    /// ```rust
    /// use tradebot::prelude::*;
    ///
    /// let summary = Summary::compute(&[], &[]);
    /// assert_eq!(summary.trades, 0);
    /// assert_eq!(summary.profit_factor, 0.0);
    /// ```
    pub fn compute(equity: &[EquityPoint], trades: &[Trade]) -> Self {
        let mut pnl = 0.0;
        let mut gains = 0.0;
        let mut losses = 0.0;
        let mut wins = 0;
        let mut closes = 0;

        for trade in trades.iter().filter(|t| t.kind == EventKind::Close) {
            closes += 1;
            pnl += trade.pnl;
            if trade.pnl >= 0.0 {
                gains += trade.pnl;
            } else {
                losses -= trade.pnl;
            }
            if trade.pnl > 0.0 {
                wins += 1;
            }
        }

        Self {
            pnl,
            trades: closes,
            win_rate: if closes == 0 { 0.0 } else { wins as f64 / closes as f64 },
            profit_factor: if losses == 0.0 { 0.0 } else { gains / losses },
            max_drawdown: max_drawdown(equity),
        }
    }
}

/// Most negative `(equity - peak) / peak * 100` along the curve, `0` for an empty one.
pub fn max_drawdown(equity: &[EquityPoint]) -> f64 {
    let Some(first) = equity.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut worst = 0.0_f64;
    for point in &equity[1..] {
        peak = peak.max(point.equity);
        worst = worst.min((point.equity - peak) / peak * 100.0);
    }
    worst
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Summary ===")?;
        writeln!(f, "Profit & Loss (P&L): {:.2}", self.pnl)?;
        writeln!(f, "Trades: {}", self.trades)?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate * 100.0)?;
        writeln!(f, "Profit Factor: {:.2}", self.profit_factor)?;
        write!(f, "Max Drawdown: {:.2}%", self.max_drawdown)
    }
}

#[cfg(test)]
fn point(equity: f64) -> EquityPoint {
    EquityPoint {
        timestamp: chrono::DateTime::default(),
        equity,
    }
}

#[cfg(test)]
fn close(pnl: f64) -> Trade {
    Trade {
        timestamp: chrono::DateTime::default(),
        kind: EventKind::Close,
        side: "long".to_owned(),
        quantity: 1.0,
        price: 100.0 + pnl,
        pnl,
        fee: 0.0,
        note: String::new(),
    }
}

#[cfg(test)]
#[test]
fn max_drawdown_from_peak() {
    let curve = [point(10000.0), point(12000.0), point(9000.0), point(11000.0)];
    assert_eq!(max_drawdown(&curve), -25.0); // (9000 - 12000) / 12000
}

#[cfg(test)]
#[test]
fn max_drawdown_no_points() {
    assert_eq!(max_drawdown(&[]), 0.0);
    assert_eq!(max_drawdown(&[point(10000.0)]), 0.0);
}

#[cfg(test)]
#[test]
fn profit_factor() {
    let summary = Summary::compute(&[], &[close(20.0), close(-10.0)]);
    assert_eq!(summary.profit_factor, 2.0);
    assert_eq!(summary.pnl, 10.0);
}

#[cfg(test)]
#[test]
fn profit_factor_no_losses() {
    let summary = Summary::compute(&[], &[close(20.0)]);
    assert_eq!(summary.profit_factor, 0.0);
}

#[cfg(test)]
#[test]
fn win_rate() {
    let summary = Summary::compute(&[], &[close(20.0), close(-10.0), close(0.0), close(5.0)]);
    assert_eq!(summary.trades, 4);
    assert_eq!(summary.win_rate, 0.5); // zero P&L is not a win
}

#[cfg(test)]
#[test]
fn win_rate_no_trades() {
    assert_eq!(Summary::compute(&[], &[]).win_rate, 0.0);
}

#[cfg(test)]
#[test]
fn only_closes_count() {
    let mut open = close(50.0);
    open.kind = EventKind::Open;
    let summary = Summary::compute(&[], &[open, close(-5.0)]);
    assert_eq!(summary.trades, 1);
    assert_eq!(summary.pnl, -5.0);
    assert_eq!(summary.win_rate, 0.0);
}

#[cfg(test)]
#[test]
fn display() {
    let summary = Summary::compute(&[point(100.0), point(90.0)], &[close(20.0), close(-10.0)]);
    let text = summary.to_string();
    assert!(text.contains("Win Rate: 50.00%"));
    assert!(text.contains("Max Drawdown: -10.00%"));
}
