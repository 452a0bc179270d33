use std::collections::{BTreeMap, btree_map::Values};

use tracing::debug;

use crate::{
    engine::{Fill, OrderSide, Position, PositionSide, RoundTrip, Trade},
    errors::{Error, Result},
};

/// The authoritative cash, position and trade-history state of one
/// simulated account.
///
/// Only the engine mutates a ledger; strategies receive `&Ledger`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Ledger {
    // Starting cash, kept for reporting
    initial_capital: f64,
    cash: f64,
    // Cumulative fees paid
    fees: f64,
    // At most one position per instrument
    positions: BTreeMap<String, Position>,
    trades: Vec<Trade>,
    round_trips: Vec<RoundTrip>,
}

impl Ledger {
    /// Creates a ledger holding `initial_capital` in cash.
    /// Non-positive or non-finite capital is rejected.
    pub fn new(initial_capital: f64) -> Result<Self> {
        if !initial_capital.is_finite() || initial_capital <= 0.0 {
            return Err(Error::NegZeroCapital(initial_capital));
        }

        Ok(Self {
            initial_capital,
            cash: initial_capital,
            fees: 0.0,
            positions: BTreeMap::new(),
            trades: Vec::new(),
            round_trips: Vec::new(),
        })
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    /// Returns the fees paid so far.
    pub fn fees_paid(&self) -> f64 {
        self.fees
    }

    /// Returns the open position in `instrument`, if any.
    pub fn position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    /// Returns an iterator over the open positions.
    pub fn positions(&self) -> Values<'_, String, Position> {
        self.positions.values()
    }

    /// Signed exposure in `instrument`: positive long, negative short, zero when flat.
    pub fn position_size(&self, instrument: &str) -> f64 {
        self.position(instrument).map_or(0.0, Position::signed_size)
    }

    /// Returns every fill, in execution order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Returns every realized reduction, close or flip, in execution order.
    pub fn round_trips(&self) -> &[RoundTrip] {
        &self.round_trips
    }

    /// Sum of the realized price P&L, fees excluded.
    pub fn realized_pnl(&self) -> f64 {
        self.round_trips.iter().map(|rt| rt.pnl).sum()
    }

    /// Cash plus the value of every position whose price is known.
    /// Positions without a price are left out.
    pub fn total_value<F>(&self, price_of: F) -> f64
    where
        F: Fn(&str) -> Option<f64>,
    {
        self.cash
            + self
                .positions
                .values()
                .filter_map(|p| price_of(p.instrument()).map(|price| p.market_value(price)))
                .sum::<f64>()
    }

    /// Cash plus every position marked at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        self.total_value(|_| Some(price))
    }

    /// Applies a fill to cash and positions and records the trade.
    ///
    /// A buy whose cost (notional plus fee) exceeds the available cash is
    /// dropped: nothing changes and `None` is returned.
    pub(crate) fn apply(&mut self, fill: Fill) -> Option<Trade> {
        match fill.side {
            OrderSide::Buy => {
                let cost = fill.cost();
                if cost > self.cash {
                    debug!(
                        instrument = %fill.instrument,
                        cost,
                        cash = self.cash,
                        "buy rejected: insufficient funds"
                    );
                    return None;
                }
                self.cash -= cost;
            }
            OrderSide::Sell => {
                self.cash += fill.size * fill.price - fill.fee;
            }
        }
        self.fees += fill.fee;
        self.update_position(&fill);

        let trade = Trade {
            side: fill.side,
            size: fill.size,
            price: fill.price,
            timestamp: fill.timestamp,
            instrument: fill.instrument,
            fee: fill.fee,
        };
        debug!(
            instrument = %trade.instrument,
            side = ?trade.side,
            size = trade.size,
            price = trade.price,
            fee = trade.fee,
            cash = self.cash,
            "filled"
        );
        self.trades.push(trade.clone());
        Some(trade)
    }

    fn update_position(&mut self, fill: &Fill) {
        let side = PositionSide::from(fill.side);
        let open = |size| Position::open(&fill.instrument, side, size, fill.price, fill.timestamp);

        match self.positions.remove(&fill.instrument) {
            None => {
                self.positions.insert(fill.instrument.clone(), open(fill.size));
            }
            Some(mut position) if position.side() == side => {
                position.add(fill.size, fill.price);
                self.positions.insert(fill.instrument.clone(), position);
            }
            Some(mut position) => {
                let held = position.size();
                if closes_exactly(fill.size, held) {
                    self.record_round_trip(&position, held, fill);
                } else if fill.size < held {
                    self.record_round_trip(&position, fill.size, fill);
                    position.reduce(fill.size);
                    self.positions.insert(fill.instrument.clone(), position);
                } else {
                    self.record_round_trip(&position, held, fill);
                    self.positions.insert(fill.instrument.clone(), open(fill.size - held));
                }
            }
        }
    }

    fn record_round_trip(&mut self, position: &Position, size: f64, fill: &Fill) {
        let side = position.side();
        self.round_trips.push(RoundTrip {
            instrument: fill.instrument.clone(),
            side,
            size,
            entry_price: position.entry_price(),
            exit_price: fill.price,
            entry_time: position.entry_time(),
            exit_time: fill.timestamp,
            pnl: (fill.price - position.entry_price()) * size * side.sign(),
            return_pct: position.pnl_fraction(fill.price),
        });
    }
}

/// Relative size difference under which a fill flattens a position.
const SIZE_TOLERANCE: f64 = 1e-9;

// Sizes built from fractional partial closes leave rounding residue.
fn closes_exactly(size: f64, held: f64) -> bool {
    (size - held).abs() <= SIZE_TOLERANCE * held
}

#[cfg(test)]
fn fill(side: OrderSide, size: f64, price: f64) -> Fill {
    Fill {
        side,
        size,
        price,
        fee: 0.0,
        instrument: "BTC-USD".into(),
        timestamp: chrono::DateTime::default(),
    }
}

#[cfg(test)]
#[test]
fn new_ledger_valid_capital() {
    let ledger = Ledger::new(100.0).unwrap();
    assert_eq!(ledger.cash(), 100.0);
    assert_eq!(ledger.initial_capital(), 100.0);
    assert!(ledger.trades().is_empty());
    assert_eq!(ledger.positions().count(), 0);
}

#[cfg(test)]
#[test]
fn new_ledger_invalid_capital() {
    assert!(matches!(Ledger::new(0.0), Err(Error::NegZeroCapital(_))));
    assert!(matches!(Ledger::new(-10.0), Err(Error::NegZeroCapital(_))));
    assert!(matches!(Ledger::new(f64::NAN), Err(Error::NegZeroCapital(_))));
}

#[cfg(test)]
#[test]
fn open_long() {
    let mut ledger = Ledger::new(1000.0).unwrap();
    let trade = ledger.apply(fill(OrderSide::Buy, 2.0, 100.0)).unwrap();

    assert_eq!(trade.price, 100.0);
    assert_eq!(ledger.cash(), 800.0);
    let position = ledger.position("BTC-USD").unwrap();
    assert_eq!(position.side(), PositionSide::Long);
    assert_eq!(position.size(), 2.0);
    assert_eq!(position.entry_price(), 100.0);
    assert_eq!(ledger.position_size("BTC-USD"), 2.0);
}

#[cfg(test)]
#[test]
fn open_short() {
    let mut ledger = Ledger::new(1000.0).unwrap();
    ledger.apply(fill(OrderSide::Sell, 2.0, 100.0)).unwrap();

    // short sale proceeds are credited
    assert_eq!(ledger.cash(), 1200.0);
    assert_eq!(ledger.position_size("BTC-USD"), -2.0);
    // equity marks the short as a liability
    assert_eq!(ledger.equity(100.0), 1000.0);
    assert_eq!(ledger.equity(90.0), 1020.0);
}

#[cfg(test)]
#[test]
fn add_to_long_averages_price() {
    let mut ledger = Ledger::new(1000.0).unwrap();
    ledger.apply(fill(OrderSide::Buy, 1.0, 100.0)).unwrap();
    ledger.apply(fill(OrderSide::Buy, 3.0, 120.0)).unwrap();

    let position = ledger.position("BTC-USD").unwrap();
    assert_eq!(position.size(), 4.0);
    assert_eq!(position.entry_price(), 115.0);
    assert!(ledger.round_trips().is_empty());
}

#[cfg(test)]
#[test]
fn partial_close_long() {
    let mut ledger = Ledger::new(1000.0).unwrap();
    ledger.apply(fill(OrderSide::Buy, 3.0, 100.0)).unwrap();
    ledger.apply(fill(OrderSide::Sell, 1.0, 110.0)).unwrap();

    let position = ledger.position("BTC-USD").unwrap();
    assert_eq!(position.size(), 2.0);
    assert_eq!(position.entry_price(), 100.0);
    assert_eq!(ledger.cash(), 810.0);

    let rt = &ledger.round_trips()[0];
    assert_eq!(rt.size, 1.0);
    assert_eq!(rt.pnl, 10.0);
    assert_eq!(rt.side, PositionSide::Long);
}

#[cfg(test)]
#[test]
fn exact_close_goes_flat() {
    let mut ledger = Ledger::new(1000.0).unwrap();
    ledger.apply(fill(OrderSide::Sell, 2.0, 100.0)).unwrap();
    ledger.apply(fill(OrderSide::Buy, 2.0, 90.0)).unwrap();

    assert!(ledger.position("BTC-USD").is_none());
    assert_eq!(ledger.position_size("BTC-USD"), 0.0);
    assert_eq!(ledger.cash(), 1020.0);
    assert_eq!(ledger.realized_pnl(), 20.0);
    assert!(ledger.round_trips()[0].return_pct > 0.0);
}

#[cfg(test)]
#[test]
fn buy_flips_short_to_long() {
    let mut ledger = Ledger::new(1000.0).unwrap();
    ledger.apply(fill(OrderSide::Sell, 1.0, 100.0)).unwrap();
    ledger.apply(fill(OrderSide::Buy, 3.0, 95.0)).unwrap();

    assert_eq!(ledger.trades().len(), 2);
    let position = ledger.position("BTC-USD").unwrap();
    assert_eq!(position.side(), PositionSide::Long);
    assert_eq!(position.size(), 2.0);
    assert_eq!(position.entry_price(), 95.0);
    assert_eq!(ledger.round_trips().len(), 1);
    assert_eq!(ledger.round_trips()[0].size, 1.0);
}

#[cfg(test)]
#[test]
fn sell_flips_long_to_short() {
    let mut ledger = Ledger::new(1000.0).unwrap();
    ledger.apply(fill(OrderSide::Buy, 2.0, 100.0)).unwrap();
    ledger.apply(fill(OrderSide::Sell, 5.0, 110.0)).unwrap();

    let position = ledger.position("BTC-USD").unwrap();
    assert_eq!(position.side(), PositionSide::Short);
    assert_eq!(position.size(), 3.0);
    assert_eq!(position.entry_price(), 110.0);
}

#[cfg(test)]
#[test]
fn insufficient_funds_leaves_state_untouched() {
    let mut ledger = Ledger::new(100.0).unwrap();
    let mut expensive = fill(OrderSide::Buy, 1.0, 100.0);
    expensive.fee = 0.1;

    assert!(ledger.apply(expensive).is_none());
    assert_eq!(ledger.cash(), 100.0);
    assert_eq!(ledger.fees_paid(), 0.0);
    assert!(ledger.trades().is_empty());
    assert!(ledger.position("BTC-USD").is_none());
}

#[cfg(test)]
#[test]
fn sells_are_never_funds_checked() {
    let mut ledger = Ledger::new(10.0).unwrap();
    assert!(ledger.apply(fill(OrderSide::Sell, 1.0, 1000.0)).is_some());
    assert_eq!(ledger.cash(), 1010.0);
}

#[cfg(test)]
#[test]
fn fees_are_accumulated() {
    let mut ledger = Ledger::new(1000.0).unwrap();
    let mut buy = fill(OrderSide::Buy, 1.0, 100.0);
    buy.fee = 0.1;
    let mut sell = fill(OrderSide::Sell, 1.0, 100.0);
    sell.fee = 0.1;
    ledger.apply(buy).unwrap();
    ledger.apply(sell).unwrap();

    assert!((ledger.fees_paid() - 0.2).abs() < 1e-12);
    assert!((ledger.cash() - 999.8).abs() < 1e-9);
}

#[cfg(test)]
#[test]
fn total_value_skips_unpriced_positions() {
    let mut ledger = Ledger::new(1000.0).unwrap();
    ledger.apply(fill(OrderSide::Buy, 1.0, 100.0)).unwrap();
    assert_eq!(ledger.total_value(|_| None), 900.0);
    assert_eq!(ledger.total_value(|i| (i == "BTC-USD").then_some(120.0)), 1020.0);
}

#[cfg(test)]
#[test]
fn fractional_partial_closes_go_flat() {
    let mut ledger = Ledger::new(1000.0).unwrap();
    ledger.apply(fill(OrderSide::Buy, 0.3, 100.0)).unwrap();
    ledger.apply(fill(OrderSide::Sell, 0.1, 100.0)).unwrap();
    ledger.apply(fill(OrderSide::Sell, 0.2, 100.0)).unwrap();

    assert!(ledger.position("BTC-USD").is_none());
    assert_eq!(ledger.position_size("BTC-USD"), 0.0);
    assert_eq!(ledger.round_trips().len(), 2);
}

#[cfg(test)]
#[test]
fn small_overshoot_still_flips() {
    let mut ledger = Ledger::new(1000.0).unwrap();
    ledger.apply(fill(OrderSide::Buy, 1.0, 100.0)).unwrap();
    ledger.apply(fill(OrderSide::Sell, 1.001, 100.0)).unwrap();

    let position = ledger.position("BTC-USD").unwrap();
    assert_eq!(position.side(), PositionSide::Short);
    assert!((position.size() - 0.001).abs() < 1e-12);
}

#[cfg(test)]
mod properties {
    use proptest::prelude::*;

    use super::*;

    fn arb_size() -> impl Strategy<Value = f64> {
        (0.01..10.0_f64).prop_map(|q| (q * 100.0).round() / 100.0)
    }

    fn arb_price() -> impl Strategy<Value = f64> {
        (1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
    }

    fn arb_side() -> impl Strategy<Value = OrderSide> {
        prop_oneof![Just(OrderSide::Buy), Just(OrderSide::Sell)]
    }

    proptest! {
        /// Adding in the existing direction keeps the average between the
        /// old average and the new fill price.
        #[test]
        fn average_price_stays_between(
            side in arb_side(),
            first in (arb_size(), arb_price()),
            adds in prop::collection::vec((arb_size(), arb_price()), 1..20),
        ) {
            let mut ledger = Ledger::new(1e12).unwrap();
            ledger.apply(fill(side, first.0, first.1)).unwrap();

            for (size, price) in adds {
                let before = ledger.position("BTC-USD").unwrap().entry_price();
                ledger.apply(fill(side, size, price)).unwrap();
                let after = ledger.position("BTC-USD").unwrap().entry_price();

                let (lo, hi) = (before.min(price), before.max(price));
                let eps = 1e-9 * hi;
                prop_assert!(after >= lo - eps && after <= hi + eps);
            }
        }

        /// Every accepted fill moves cash by exactly `∓ size × price ∓ fee`.
        #[test]
        fn cash_is_conserved(
            fills in prop::collection::vec((arb_side(), arb_size(), arb_price(), 0.0..0.01_f64), 1..40),
        ) {
            let mut ledger = Ledger::new(10_000.0).unwrap();

            for (side, size, price, rate) in fills {
                let mut f = fill(side, size, price);
                f.fee = size * price * rate;
                let fee = f.fee;
                let before = ledger.cash();

                match ledger.apply(f) {
                    Some(_) => {
                        let expected = match side {
                            OrderSide::Buy => before - size * price - fee,
                            OrderSide::Sell => before + size * price - fee,
                        };
                        prop_assert!((ledger.cash() - expected).abs() <= 1e-9 * expected.abs().max(1.0));
                    }
                    None => {
                        prop_assert_eq!(side, OrderSide::Buy);
                        prop_assert_eq!(ledger.cash(), before);
                    }
                }
            }
        }

        /// Exposure never holds both directions and a flat book has no position entry.
        #[test]
        fn single_position_per_instrument(
            fills in prop::collection::vec((arb_side(), arb_size(), arb_price()), 1..40),
        ) {
            let mut ledger = Ledger::new(1e12).unwrap();
            let mut expected_exposure = 0.0;

            for (side, size, price) in fills {
                ledger.apply(fill(side, size, price)).unwrap();
                expected_exposure += match side {
                    OrderSide::Buy => size,
                    OrderSide::Sell => -size,
                };

                prop_assert!(ledger.positions().count() <= 1);
                if let Some(position) = ledger.position("BTC-USD") {
                    prop_assert!(position.size() > 0.0);
                }
                prop_assert!((ledger.position_size("BTC-USD") - expected_exposure).abs() < 1e-6);
            }
        }
    }
}
