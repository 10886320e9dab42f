use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Buy/Sell side of an order, a book level, or a fill.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// `+1` for [`Side::Buy`], `-1` for [`Side::Sell`]. Used throughout position and
    /// hedge-exposure arithmetic, where a signed quantity is more convenient than a
    /// two-armed match.
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}
