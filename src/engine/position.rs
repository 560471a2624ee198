#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction of the open position.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PositionSide {
    /// No open position.
    #[default]
    Flat,
    /// Profits when price rises.
    Long,
    /// Profits when price falls.
    Short,
}

impl PositionSide {
    /// Upper-case label used in trade logs (`LONG`, `SHORT`, `FLAT`).
    pub fn label(&self) -> &'static str {
        match self {
            Self::Long => "LONG",
            Self::Short => "SHORT",
            Self::Flat => "FLAT",
        }
    }
}

impl std::str::FromStr for PositionSide {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> crate::errors::Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "LONG" => Ok(Self::Long),
            "SHORT" => Ok(Self::Short),
            "FLAT" => Ok(Self::Flat),
            other => Err(crate::errors::Error::TradeLog(format!("unknown position side `{other}`"))),
        }
    }
}

/// The single position owned by an engine.
///
/// A flat position always has zero quantity and zero entry price.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    side: PositionSide,
    entry_price: f64,
    quantity: f64,
}

impl Position {
    /// Returns the side.
    pub fn side(&self) -> PositionSide {
        self.side
    }

    /// Returns the held quantity.
    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    /// Returns the (quantity-weighted) entry price.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns `true` when nothing is held.
    pub fn is_flat(&self) -> bool {
        self.side == PositionSide::Flat
    }

    /// Mark-to-market profit or loss at `price`.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Long => (price - self.entry_price) * self.quantity,
            PositionSide::Short => (self.entry_price - price) * self.quantity,
            PositionSide::Flat => 0.0,
        }
    }

    /// Adds `quantity` filled at `price` to a same-side position.
    ///
    /// The entry price becomes the quantity-weighted average of the old and new fills.
    pub(crate) fn scale_in(&mut self, quantity: f64, price: f64) {
        let total = self.quantity + quantity;
        self.entry_price = (self.entry_price * self.quantity + price * quantity) / total;
        self.quantity = total;
    }
}

impl From<(PositionSide, f64, f64)> for Position {
    fn from((side, entry_price, quantity): (PositionSide, f64, f64)) -> Self {
        if side == PositionSide::Flat {
            return Self::default();
        }
        Self {
            side,
            entry_price,
            quantity,
        }
    }
}

#[cfg(test)]
#[test]
fn long_unrealized_pnl() {
    let position = Position::from((PositionSide::Long, 100.0, 2.0));
    assert_eq!(position.unrealized_pnl(110.0), 20.0);
    assert_eq!(position.unrealized_pnl(95.0), -10.0);
}

#[cfg(test)]
#[test]
fn short_unrealized_pnl() {
    let position = Position::from((PositionSide::Short, 100.0, 2.0));
    assert_eq!(position.unrealized_pnl(90.0), 20.0);
    assert_eq!(position.unrealized_pnl(105.0), -10.0);
}

#[cfg(test)]
#[test]
fn flat_has_no_quantity() {
    let position = Position::from((PositionSide::Flat, 100.0, 2.0));
    assert!(position.is_flat());
    assert_eq!(position.quantity(), 0.0);
    assert_eq!(position.unrealized_pnl(500.0), 0.0);
}

#[cfg(test)]
#[test]
fn scale_in_weights_entry() {
    let mut position = Position::from((PositionSide::Long, 100.0, 1.0));
    position.scale_in(3.0, 120.0);
    assert_eq!(position.quantity(), 4.0);
    assert_eq!(position.entry_price(), 115.0); // (100 + 360) / 4
}
