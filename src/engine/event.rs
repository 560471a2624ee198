use std::fmt;

use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::PositionSide;
use crate::errors::{Error, Result};

/// Kind of fill recorded by the engine.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A flat engine opened a position.
    Open,
    /// A same-side fill was added to the open position.
    Add,
    /// The position was closed and its P&L realized.
    Close,
}

impl EventKind {
    /// Upper-case label (`OPEN`, `ADD`, `CLOSE`).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Add => "ADD",
            Self::Close => "CLOSE",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl std::str::FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "ADD" => Ok(Self::Add),
            "CLOSE" => Ok(Self::Close),
            other => Err(Error::TradeLog(format!("unknown event kind `{other}`"))),
        }
    }
}

/// Immutable record of one fill.
///
/// The same structure is handed to the trade hook and appended to the trade log,
/// so the log entry type is an alias of it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    /// Timestamp of the candle that triggered the fill.
    pub timestamp: DateTime<Utc>,
    /// Traded symbol.
    pub symbol: String,
    /// Candle timeframe.
    pub timeframe: String,
    /// Fill kind.
    pub kind: EventKind,
    /// Side of the position affected by the fill.
    pub side: PositionSide,
    /// Filled quantity (the whole position on close).
    pub quantity: f64,
    /// Fill price.
    pub price: f64,
    /// Realized P&L, zero unless `kind` is `Close`.
    pub pnl: f64,
    /// Fee charged for the fill; only set by the backtest pipeline.
    pub fee: f64,
    /// Free-text comment carried from the signal.
    pub comment: String,
}

/// Entry of the durable trade log.
pub type TradeLogEntry = TradeEvent;

/// Callback receiving a human-readable line for every fill.
pub type Notify = Box<dyn FnMut(&str) + Send>;

/// Callback receiving the structured record of every fill.
pub type TradeHook = Box<dyn FnMut(&TradeEvent) + Send>;

#[cfg(test)]
#[test]
fn parse_event_kind() {
    assert_eq!("close".parse::<EventKind>().unwrap(), EventKind::Close);
    assert_eq!("ADD".parse::<EventKind>().unwrap(), EventKind::Add);
    assert!("reverse".parse::<EventKind>().is_err());
    assert_eq!(EventKind::Open.to_string(), "OPEN");
}
