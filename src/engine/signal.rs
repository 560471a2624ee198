#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What a strategy asks the engine to do on the current candle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Action {
    /// Do nothing.
    #[default]
    None,
    /// Open or add to a long position.
    Buy,
    /// Open or add to a short position.
    Sell,
    /// Close the open position, whatever its side.
    Close,
}

/// A trading intent produced fresh for every candle.
///
/// `size` is a fraction of equity (`0.02` = 2%). Stop-loss and take-profit are
/// informational price levels carried into notifications.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signal {
    /// Requested action.
    pub action: Action,
    /// Fraction of equity to commit.
    pub size: f64,
    /// Optional stop-loss price.
    pub stop_loss: Option<f64>,
    /// Optional take-profit price.
    pub take_profit: Option<f64>,
    /// Free-text reason.
    pub comment: String,
}

impl Signal {
    /// A signal asking for no action.
    pub fn none() -> Self {
        Self::default()
    }

    /// A signal closing the open position.
    pub fn close(comment: impl Into<String>) -> Self {
        Self {
            action: Action::Close,
            comment: comment.into(),
            ..Self::default()
        }
    }

    /// Returns `true` when the engine has nothing to do.
    pub fn is_none(&self) -> bool {
        self.action == Action::None
    }
}

type S1 = (Action, f64);
type S2 = (Action, f64, f64, f64, &'static str);
impl From<S1> for Signal {
    fn from((action, size): S1) -> Self {
        Self {
            action,
            size,
            ..Self::default()
        }
    }
}

impl From<S2> for Signal {
    fn from((action, size, stop_loss, take_profit, comment): S2) -> Self {
        Self {
            action,
            size,
            stop_loss: Some(stop_loss),
            take_profit: Some(take_profit),
            comment: comment.to_owned(),
        }
    }
}
