use chrono::{DateTime, Utc};

use crate::engine::OrderSide;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Returns the order side that adds to a position on this side.
    pub fn opening_side(self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }

    /// Returns the order side that reduces a position on this side.
    pub fn closing_side(self) -> OrderSide {
        self.opening_side().opposite()
    }

    /// `1.0` for long, `-1.0` for short.
    pub fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

impl From<OrderSide> for PositionSide {
    fn from(value: OrderSide) -> Self {
        match value {
            OrderSide::Buy => Self::Long,
            OrderSide::Sell => Self::Short,
        }
    }
}

/// Net directional exposure in one instrument.
///
/// `size` is always strictly positive, the direction lives in `side`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    instrument: String,
    side: PositionSide,
    size: f64,
    entry_price: f64,
    entry_time: DateTime<Utc>,
}

impl Position {
    pub(crate) fn open(
        instrument: impl Into<String>,
        side: PositionSide,
        size: f64,
        entry_price: f64,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            size,
            entry_price,
            entry_time,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn side(&self) -> PositionSide {
        self.side
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    /// Size with the direction applied: positive long, negative short.
    pub fn signed_size(&self) -> f64 {
        self.side.sign() * self.size
    }

    /// Volume-weighted average entry price.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    /// Adds `size` at `price` in the position's own direction and
    /// recomputes the average entry price.
    pub(crate) fn add(&mut self, size: f64, price: f64) {
        let new_size = self.size + size;
        self.entry_price = (self.entry_price * self.size + price * size) / new_size;
        self.size = new_size;
    }

    /// Reduces the position by `size`, which must be smaller than the current size.
    /// The entry price is left unchanged.
    pub(crate) fn reduce(&mut self, size: f64) {
        self.size -= size;
    }

    /// Value of the position marked at `price`: `size × price`, negated for shorts.
    pub fn market_value(&self, price: f64) -> f64 {
        self.signed_size() * price
    }

    /// Unrealized profit or loss at `price`.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.signed_size()
    }

    /// Fractional move from the entry price at `price`, positive when the
    /// move is in the position's favour.
    pub fn pnl_fraction(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) / self.entry_price
    }
}
