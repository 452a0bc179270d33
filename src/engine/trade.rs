use chrono::{DateTime, Utc};

use crate::engine::{OrderSide, PositionSide};

/// A completed fill. Trades are append-only and never mutated.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub side: OrderSide,
    pub size: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub instrument: String,
    pub fee: f64,
}

impl Trade {
    /// Notional value of the fill (`size × price`), fee excluded.
    pub fn notional(&self) -> f64 {
        self.size * self.price
    }

    /// Cash change caused by the fill, fee included.
    pub fn cash_flow(&self) -> f64 {
        match self.side {
            OrderSide::Buy => -(self.notional() + self.fee),
            OrderSide::Sell => self.notional() - self.fee,
        }
    }
}

/// The realized part of a position, recorded each time exposure is
/// reduced, closed or flipped.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTrip {
    pub instrument: String,
    pub side: PositionSide,
    pub size: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    /// Price P&L, fees excluded.
    pub pnl: f64,
    /// Side-aware fractional return on the entry price.
    pub return_pct: f64,
}

/// One point of the equity curve, taken at a bar close.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquitySample {
    pub timestamp: DateTime<Utc>,
    /// Cash plus the mark-to-market value of the open position.
    pub equity: f64,
    pub cash: f64,
    pub close: f64,
}

#[cfg(test)]
#[test]
fn trade_cash_flow() {
    let buy = Trade {
        side: OrderSide::Buy,
        size: 2.0,
        price: 100.0,
        timestamp: DateTime::default(),
        instrument: "BTC-USD".into(),
        fee: 0.2,
    };
    assert_eq!(buy.notional(), 200.0);
    assert_eq!(buy.cash_flow(), -200.2);

    let sell = Trade {
        side: OrderSide::Sell,
        ..buy
    };
    assert_eq!(sell.cash_flow(), 199.8);
}
