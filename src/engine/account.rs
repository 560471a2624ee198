#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::Position;
use crate::errors::{Error, Result};

/// Equity ledger of one engine, in quote currency.
///
/// Equity only moves when a position is closed and its P&L realized.
#[derive(Debug, Clone)]
pub(crate) struct Account {
    // Starting equity
    initial_equity: f64,
    // Realized equity
    equity: f64,
}

impl Account {
    /// Creates a ledger with the given starting equity.
    /// Zero, negative and non-finite equities are rejected.
    pub(crate) fn new(equity: f64) -> Result<Self> {
        if equity <= 0.0 || !equity.is_finite() {
            return Err(Error::InvalidParameters(format!("equity must be positive (got: {equity})")));
        }
        Ok(Self {
            equity,
            initial_equity: equity,
        })
    }

    pub(crate) fn equity(&self) -> f64 {
        self.equity
    }

    pub(crate) fn initial_equity(&self) -> f64 {
        self.initial_equity
    }

    /// Quote amount committed by a signal of `fraction` of equity.
    pub(crate) fn size(&self, fraction: f64) -> f64 {
        self.equity * fraction
    }

    /// Books realized profit or loss.
    pub(crate) fn realize(&mut self, pnl: f64) {
        self.equity += pnl;
    }
}

/// Read-only view of the account handed to strategies and risk models.
///
/// Built fresh for every candle and marked to market at `mark_price`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccountState {
    /// Realized equity.
    pub equity: f64,
    /// The open position (flat when nothing is held).
    pub position: Position,
    /// Price used for the mark-to-market.
    pub mark_price: f64,
}

impl AccountState {
    /// Unrealized profit or loss of the position at the mark price.
    pub fn unrealized_pnl(&self) -> f64 {
        self.position.unrealized_pnl(self.mark_price)
    }

    /// Equity plus unrealized P&L.
    pub fn total_equity(&self) -> f64 {
        self.equity + self.unrealized_pnl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PositionSide;

    #[test]
    fn new_account_invalid_equity() {
        assert!(matches!(Account::new(0.0), Err(Error::InvalidParameters(_))));
        assert!(matches!(Account::new(-10.0), Err(Error::InvalidParameters(_))));
        assert!(matches!(Account::new(f64::NAN), Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn realize_moves_equity() {
        let mut account = Account::new(1000.0).unwrap();
        assert_eq!(account.size(0.02), 20.0);

        account.realize(-50.0);
        assert_eq!(account.equity(), 950.0);
        assert_eq!(account.initial_equity(), 1000.0);
    }

    #[test]
    fn snapshot_marks_to_market() {
        let state = AccountState {
            equity: 1000.0,
            position: Position::from((PositionSide::Long, 100.0, 2.0)),
            mark_price: 105.0,
        };
        assert_eq!(state.unrealized_pnl(), 10.0);
        assert_eq!(state.total_equity(), 1010.0);
    }
}
