use chrono::{DateTime, Utc};

use crate::{
    engine::{Bar, Order, OrderKind, OrderSide},
    errors::{Error, Result},
};

/// A priced fill, produced by the fill model before the ledger applies it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub side: OrderSide,
    pub size: f64,
    pub price: f64,
    pub fee: f64,
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
}

impl Fill {
    /// Total cash a buy needs: notional plus fee.
    pub fn cost(&self) -> f64 {
        self.size * self.price + self.fee
    }
}

/// Deterministic single-bar fill rules.
///
/// - Market orders always fill at the bar open, moved against the trader by
///   `open × slippage`.
/// - Buy limits fill when `limit >= low` at `min(limit, open)`.
/// - Sell limits fill when `limit <= high` at `max(limit, open)`.
/// - Every fill pays `size × price × commission`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FillModel {
    commission: f64,
    slippage: f64,
}

impl FillModel {
    /// Creates a fill model with fractional commission and slippage rates
    /// (e.g. `0.001` for 0.1%).
    pub fn new(commission: f64, slippage: f64) -> Result<Self> {
        check_rate("commission", commission)?;
        check_rate("slippage", slippage)?;
        Ok(Self { commission, slippage })
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    pub fn slippage(&self) -> f64 {
        self.slippage
    }

    /// Prices `order` against `bar`, or returns `None` if a limit was not touched.
    /// The fill is stamped with the bar timestamp.
    ///
    /// Funds are not checked here, see `Ledger::apply`.
    pub fn fill(&self, order: &Order, bar: &Bar) -> Option<Fill> {
        let price = match order.kind() {
            OrderKind::Market => self.slipped(order.side(), bar.open()),
            OrderKind::Limit(limit) => match order.side() {
                OrderSide::Buy if limit >= bar.low() => limit.min(bar.open()),
                OrderSide::Sell if limit <= bar.high() => limit.max(bar.open()),
                _ => return None,
            },
        };
        Some(self.priced(order, price, bar.timestamp()))
    }

    /// Fills a market order at an explicit reference price (used for exits
    /// taken at the bar close).
    pub fn fill_at(&self, order: &Order, reference: f64, timestamp: DateTime<Utc>) -> Fill {
        let price = match order.kind() {
            OrderKind::Market => self.slipped(order.side(), reference),
            OrderKind::Limit(limit) => limit,
        };
        self.priced(order, price, timestamp)
    }

    fn slipped(&self, side: OrderSide, price: f64) -> f64 {
        match side {
            OrderSide::Buy => price * (1.0 + self.slippage),
            OrderSide::Sell => price * (1.0 - self.slippage),
        }
    }

    fn priced(&self, order: &Order, price: f64, timestamp: DateTime<Utc>) -> Fill {
        Fill {
            side: order.side(),
            size: order.size(),
            price,
            fee: order.size() * price * self.commission,
            instrument: order.instrument().to_string(),
            timestamp,
        }
    }
}

pub(crate) fn check_rate(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::InvalidRate { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::engine::BarBuilder;

    fn bar() -> Bar {
        BarBuilder::builder()
            .timestamp(DateTime::from_timestamp_secs(1515151515).unwrap())
            .open(100.0)
            .high(110.0)
            .low(90.0)
            .close(105.0)
            .build()
            .unwrap()
    }

    #[test]
    fn market_buy_fills_at_open_plus_slippage() {
        let model = FillModel::new(0.0, 0.01).unwrap();
        let order = Order::market(OrderSide::Buy, 1.0).unwrap();
        let fill = model.fill(&order, &bar()).unwrap();
        assert!((fill.price - 101.0).abs() < 1e-9);
        assert_eq!(fill.fee, 0.0);
    }

    #[test]
    fn market_sell_fills_at_open_minus_slippage() {
        let model = FillModel::new(0.0, 0.01).unwrap();
        let order = Order::market(OrderSide::Sell, 1.0).unwrap();
        let fill = model.fill(&order, &bar()).unwrap();
        assert!((fill.price - 99.0).abs() < 1e-9);
        assert_eq!(fill.timestamp, bar().timestamp());
    }

    #[test]
    fn fee_is_charged_on_fill_notional() {
        let model = FillModel::new(0.001, 0.0).unwrap();
        let order = Order::market(OrderSide::Buy, 2.0).unwrap();
        let fill = model.fill(&order, &bar()).unwrap();
        assert_eq!(fill.price, 100.0);
        assert!((fill.fee - 0.2).abs() < 1e-12);
        assert!((fill.cost() - 200.2).abs() < 1e-12);
    }

    #[test]
    fn buy_limit_touched() {
        let model = FillModel::default();
        // limit below open but above low: fills at the limit
        let order = Order::limit(OrderSide::Buy, 1.0, 95.0).unwrap();
        assert_eq!(model.fill(&order, &bar()).unwrap().price, 95.0);
        // limit above open: fills at the open
        let order = Order::limit(OrderSide::Buy, 1.0, 104.0).unwrap();
        assert_eq!(model.fill(&order, &bar()).unwrap().price, 100.0);
        // limit exactly at the low
        let order = Order::limit(OrderSide::Buy, 1.0, 90.0).unwrap();
        assert_eq!(model.fill(&order, &bar()).unwrap().price, 90.0);
    }

    #[test]
    fn buy_limit_not_touched() {
        let model = FillModel::default();
        let order = Order::limit(OrderSide::Buy, 1.0, 89.99).unwrap();
        assert!(model.fill(&order, &bar()).is_none());
    }

    #[test]
    fn sell_limit_touched() {
        let model = FillModel::default();
        let order = Order::limit(OrderSide::Sell, 1.0, 108.0).unwrap();
        assert_eq!(model.fill(&order, &bar()).unwrap().price, 108.0);
        let order = Order::limit(OrderSide::Sell, 1.0, 96.0).unwrap();
        assert_eq!(model.fill(&order, &bar()).unwrap().price, 100.0);
    }

    #[test]
    fn sell_limit_not_touched() {
        let model = FillModel::default();
        let order = Order::limit(OrderSide::Sell, 1.0, 110.01).unwrap();
        assert!(model.fill(&order, &bar()).is_none());
    }

    #[test]
    fn limit_ignores_slippage() {
        let model = FillModel::new(0.0, 0.05).unwrap();
        let order = Order::limit(OrderSide::Buy, 1.0, 95.0).unwrap();
        assert_eq!(model.fill(&order, &bar()).unwrap().price, 95.0);
    }

    #[test]
    fn fill_at_reference_price() {
        let model = FillModel::new(0.0, 0.01).unwrap();
        let order = Order::market(OrderSide::Sell, 1.0).unwrap();
        let fill = model.fill_at(&order, 105.0, bar().timestamp());
        assert!((fill.price - 103.95).abs() < 1e-9);
        assert_eq!(fill.timestamp, bar().timestamp());
    }

    #[test]
    fn reject_invalid_rates() {
        assert!(matches!(FillModel::new(-0.1, 0.0), Err(Error::InvalidRate { name: "commission", .. })));
        assert!(matches!(FillModel::new(0.0, f64::NAN), Err(Error::InvalidRate { name: "slippage", .. })));
    }
}
