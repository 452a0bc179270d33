use crate::{
    engine::{Bar, Ledger, Order, OrderSide, Position},
    errors::Result,
};

/// Read-only view handed to a strategy at each step.
///
/// `history` holds bars `0..=index`, so the strategy can never look ahead.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    history: &'a [Bar],
    ledger: &'a Ledger,
    instrument: &'a str,
}

impl<'a> Context<'a> {
    /// `history` must not be empty; its last bar is the current one.
    pub(crate) fn new(history: &'a [Bar], ledger: &'a Ledger, instrument: &'a str) -> Self {
        Self {
            history,
            ledger,
            instrument,
        }
    }

    /// Bars seen so far, the current one last.
    pub fn history(&self) -> &'a [Bar] {
        self.history
    }

    /// Index of the current bar in the series.
    pub fn index(&self) -> usize {
        self.history.len().saturating_sub(1)
    }

    /// The bar being processed.
    pub fn bar(&self) -> Option<&'a Bar> {
        self.history.last()
    }

    /// Close of the bar being processed, or `0.0` on an empty history.
    pub fn close(&self) -> f64 {
        self.bar().map_or(0.0, Bar::close)
    }

    /// The last `n` bars (fewer at the start of the series).
    pub fn lookback(&self, n: usize) -> &'a [Bar] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    pub fn ledger(&self) -> &'a Ledger {
        self.ledger
    }

    pub fn instrument(&self) -> &'a str {
        self.instrument
    }

    pub fn cash(&self) -> f64 {
        self.ledger.cash()
    }

    /// The open position in the replayed instrument.
    pub fn position(&self) -> Option<&'a Position> {
        self.ledger.position(self.instrument)
    }

    /// Signed exposure in the replayed instrument.
    pub fn position_size(&self) -> f64 {
        self.ledger.position_size(self.instrument)
    }

    fn stamp(&self, order: Order) -> Order {
        let order = order.on(self.instrument);
        match self.bar() {
            Some(bar) => order.at(bar.timestamp()),
            None => order,
        }
    }

    /// A market buy for the replayed instrument.
    pub fn buy(&self, size: f64) -> Result<Order> {
        Order::market(OrderSide::Buy, size).map(|o| self.stamp(o))
    }

    /// A market sell for the replayed instrument.
    pub fn sell(&self, size: f64) -> Result<Order> {
        Order::market(OrderSide::Sell, size).map(|o| self.stamp(o))
    }

    /// A limit buy for the replayed instrument.
    pub fn buy_limit(&self, size: f64, price: f64) -> Result<Order> {
        Order::limit(OrderSide::Buy, size, price).map(|o| self.stamp(o))
    }

    /// A limit sell for the replayed instrument.
    pub fn sell_limit(&self, size: f64, price: f64) -> Result<Order> {
        Order::limit(OrderSide::Sell, size, price).map(|o| self.stamp(o))
    }

    /// The market order that would flatten the current position, if there is one.
    pub fn close_position(&self) -> Result<Option<Order>> {
        self.position()
            .map(|p| Order::market(p.side().closing_side(), p.size()).map(|o| self.stamp(o)))
            .transpose()
    }
}

/// Take-profit and stop-loss thresholds, in percent of the entry price
/// (e.g. `5.0` for 5%).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExitRule {
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
}

/// Why a position was closed automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

impl ExitRule {
    pub fn new(take_profit: Option<f64>, stop_loss: Option<f64>) -> Self {
        Self { take_profit, stop_loss }
    }

    pub fn is_empty(&self) -> bool {
        self.take_profit.is_none() && self.stop_loss.is_none()
    }

    /// Checks `position` against `price`. Take-profit wins when both thresholds
    /// are crossed.
    pub fn triggered(&self, position: &Position, price: f64) -> Option<ExitReason> {
        let moved = position.pnl_fraction(price);
        if let Some(take_profit) = self.take_profit
            && moved >= take_profit / 100.0
        {
            return Some(ExitReason::TakeProfit);
        }
        if let Some(stop_loss) = self.stop_loss
            && moved <= -(stop_loss / 100.0)
        {
            return Some(ExitReason::StopLoss);
        }
        None
    }
}

/// Decision logic driven by the replay loop.
///
/// The engine calls [`Strategy::decide`] once per bar, after queued orders
/// were executed, and executes the returned orders against the next bar.
pub trait Strategy {
    /// Returns the orders to execute at the next bar.
    fn decide(&mut self, ctx: &Context<'_>) -> Result<Vec<Order>>;

    /// Automatic exits applied by the engine at each bar close.
    fn exit_rule(&self) -> ExitRule {
        ExitRule::default()
    }

    /// Indicator columns every bar must carry.
    fn required_indicators(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn decide(&mut self, ctx: &Context<'_>) -> Result<Vec<Order>> {
        (**self).decide(ctx)
    }

    fn exit_rule(&self) -> ExitRule {
        (**self).exit_rule()
    }

    fn required_indicators(&self) -> Vec<String> {
        (**self).required_indicators()
    }
}

/// Strategy backed by a closure, see [`from_fn`].
pub struct FnStrategy<F>(F);

/// Wraps a closure as a [`Strategy`].
///
/// ```rust
/// use bar_replay::prelude::*;
///
/// let strategy = from_fn(|ctx| {
///     if ctx.index() == 0 {
///         return Ok(vec![ctx.buy(1.0)?]);
///     }
///     Ok(Vec::new())
/// });
/// # let _ = strategy;
/// ```
pub fn from_fn<F>(f: F) -> FnStrategy<F>
where
    F: FnMut(&Context<'_>) -> Result<Vec<Order>>,
{
    FnStrategy(f)
}

impl<F> Strategy for FnStrategy<F>
where
    F: FnMut(&Context<'_>) -> Result<Vec<Order>>,
{
    fn decide(&mut self, ctx: &Context<'_>) -> Result<Vec<Order>> {
        (self.0)(ctx)
    }
}

/// Attaches an [`ExitRule`] to any strategy.
pub struct WithExits<S> {
    inner: S,
    rule: ExitRule,
}

impl<S: Strategy> WithExits<S> {
    pub fn new(inner: S, take_profit: Option<f64>, stop_loss: Option<f64>) -> Self {
        Self {
            inner,
            rule: ExitRule::new(take_profit, stop_loss),
        }
    }
}

impl<S: Strategy> Strategy for WithExits<S> {
    fn decide(&mut self, ctx: &Context<'_>) -> Result<Vec<Order>> {
        self.inner.decide(ctx)
    }

    fn exit_rule(&self) -> ExitRule {
        self.rule
    }

    fn required_indicators(&self) -> Vec<String> {
        self.inner.required_indicators()
    }
}

/// Buys once with a fraction of the available cash and holds.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    fraction: f64,
    bought: bool,
}

impl BuyAndHold {
    /// `fraction` of the cash is invested at the first bar (clamped to `0..=1`).
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
            bought: false,
        }
    }
}

impl Default for BuyAndHold {
    fn default() -> Self {
        Self::new(0.95)
    }
}

impl Strategy for BuyAndHold {
    fn decide(&mut self, ctx: &Context<'_>) -> Result<Vec<Order>> {
        if self.bought {
            return Ok(Vec::new());
        }
        let price = ctx.close();
        if price <= 0.0 || self.fraction == 0.0 {
            return Ok(Vec::new());
        }
        self.bought = true;
        Ok(vec![ctx.buy(ctx.cash() * self.fraction / price)?])
    }
}
