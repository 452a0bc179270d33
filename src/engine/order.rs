use chrono::{DateTime, Utc};

use crate::{
    errors::{Error, Result},
    utils::random_id,
};

/// Represents the side of an order (buy or sell).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// Represents the type of an order: market, or limit at the given price.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderKind {
    Market,
    Limit(f64),
}

/// A requested trade.
///
/// Orders are immutable once built; the engine consumes each one exactly once.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Order {
    id: u32,
    side: OrderSide,
    size: f64,
    kind: OrderKind,
    instrument: String,
    timestamp: DateTime<Utc>,
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Order {
    fn build(side: OrderSide, size: f64, kind: OrderKind) -> Result<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(Error::NegZeroSize(size));
        }
        if let OrderKind::Limit(price) = kind
            && (!price.is_finite() || price <= 0.0)
        {
            return Err(Error::InvalidLimitPrice(price));
        }

        Ok(Self {
            id: random_id(),
            side,
            size,
            kind,
            instrument: String::new(),
            timestamp: DateTime::default(),
        })
    }

    /// Creates a market order.
    pub fn market(side: OrderSide, size: f64) -> Result<Self> {
        Self::build(side, size, OrderKind::Market)
    }

    /// Creates a limit order.
    pub fn limit(side: OrderSide, size: f64, price: f64) -> Result<Self> {
        Self::build(side, size, OrderKind::Limit(price))
    }

    /// Sets the instrument the order trades.
    pub fn on(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = instrument.into();
        self
    }

    /// Sets the creation timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    /// Returns the limit price, if this is a limit order.
    pub fn limit_price(&self) -> Option<f64> {
        match self.kind {
            OrderKind::Limit(price) => Some(price),
            OrderKind::Market => None,
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns true if the order is a market order.
    pub fn is_market_type(&self) -> bool {
        matches!(self.kind, OrderKind::Market)
    }
}

#[cfg(test)]
#[test]
fn create_market_order() {
    let order = Order::market(OrderSide::Buy, 2.0).unwrap().on("BTC-USD");

    assert_eq!(order.size(), 2.0);
    assert_eq!(order.side(), OrderSide::Buy);
    assert_eq!(order.instrument(), "BTC-USD");
    assert!(order.is_market_type());
    assert!(order.limit_price().is_none());
}

#[cfg(test)]
#[test]
fn create_limit_order() {
    let order = Order::limit(OrderSide::Sell, 1.5, 120.0).unwrap();

    assert_eq!(order.kind(), OrderKind::Limit(120.0));
    assert_eq!(order.limit_price(), Some(120.0));
    assert!(!order.is_market_type());
}

#[cfg(test)]
#[test]
fn reject_invalid_size() {
    assert!(matches!(Order::market(OrderSide::Buy, 0.0), Err(Error::NegZeroSize(_))));
    assert!(matches!(Order::market(OrderSide::Buy, -1.0), Err(Error::NegZeroSize(_))));
    assert!(matches!(Order::market(OrderSide::Sell, f64::NAN), Err(Error::NegZeroSize(_))));
}

#[cfg(test)]
#[test]
fn reject_invalid_limit_price() {
    let result = Order::limit(OrderSide::Buy, 1.0, 0.0);
    assert!(matches!(result, Err(Error::InvalidLimitPrice(_))));
    let result = Order::limit(OrderSide::Buy, 1.0, f64::INFINITY);
    assert!(matches!(result, Err(Error::InvalidLimitPrice(_))));
}

#[cfg(test)]
#[test]
fn order_equality() {
    let order1 = Order::market(OrderSide::Buy, 1.0).unwrap();
    let order2 = Order::market(OrderSide::Buy, 1.0).unwrap();
    assert_eq!(order1, order1.clone());
    // ids are random; a collision here is a 1 in 2^32 event
    assert_ne!(order1, order2);
}

#[cfg(test)]
#[test]
fn opposite_side() {
    assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
    assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
}
