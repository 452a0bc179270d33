//! Core replay components.
//!
//! This module provides the building blocks of a replay:
//! - `Bar` / `BarSeries`: validated OHLCV input with indicator columns.
//! - `Order`: market and limit orders returned by a strategy.
//! - `FillModel`: single-bar fill rules with slippage and commission.
//! - `Ledger`: cash, positions, trades and realized round trips.
//! - `Strategy`: the decision port driven once per bar.
//! - `Backtest`: the replay loop tying them together.

mod bar;
mod fill;
mod ledger;
mod order;
mod position;
mod series;
mod strategy;
mod trade;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, trace};

use crate::{
    config::BacktestConfig,
    errors::{Error, Result},
    metrics::{Metrics, Report, TradeStats, TradeStatsMode},
};

pub use bar::*;
pub use fill::*;
pub use ledger::*;
pub use order::*;
pub use position::*;
pub use series::*;
pub use strategy::*;
pub use trade::*;

#[cfg(test)]
mod scenarios;

/// Everything a finished replay produced.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct BacktestResult {
    /// Every executed fill, in execution order.
    pub trades: Vec<Trade>,
    /// One sample per bar, marked at the bar close.
    pub equity: Vec<EquitySample>,
    pub report: Report,
    /// Realized reductions, closes and flips.
    pub round_trips: Vec<RoundTrip>,
    /// Positions still open after the last bar. They are never liquidated.
    pub open_positions: Vec<Position>,
    pub final_cash: f64,
    /// Orders returned at the last bar, which had no bar left to fill against.
    pub pending_orders_dropped: usize,
}

/// Replays a bar series against a strategy.
///
/// At each bar `i` the loop:
/// 1. fills the orders queued at bar `i - 1` against bar `i` (unfilled ones are discarded),
/// 2. closes the open position at the bar close if the exit rule is breached,
/// 3. asks the strategy for new orders, seeing bars `0..=i` only,
/// 4. records an equity sample marked at the bar close.
///
/// ### Example
/// ```rust
/// use bar_replay::prelude::*;
/// use chrono::{DateTime, Duration};
///
/// let start = DateTime::from_timestamp_secs(1672531200).unwrap();
/// let bars = [100.0, 100.0, 105.0, 105.0]
///     .iter()
///     .enumerate()
///     .map(|(i, &price)| {
///         BarBuilder::builder()
///             .timestamp(start + Duration::days(i as i64))
///             .open(price)
///             .high(price * 1.01)
///             .low(price * 0.99)
///             .close(price)
///             .build()
///     })
///     .collect::<Result<Vec<_>>>()
///     .unwrap();
///
/// let strategy = from_fn(|ctx| {
///     if ctx.index() == 0 {
///         return Ok(vec![ctx.buy(1.0)?]);
///     }
///     Ok(Vec::new())
/// });
///
/// let series = BarSeries::new(bars).unwrap();
/// let config = BacktestConfig::default().with_commission(0.0);
/// let backtest = Backtest::new(series, WithExits::new(strategy, Some(5.0), None), config).unwrap();
/// let result = backtest.run().unwrap();
///
/// assert_eq!(result.trades.len(), 2);
/// assert_eq!(result.trades[1].price, 105.0);
/// ```
#[derive(Debug)]
pub struct Backtest<S> {
    series: BarSeries,
    strategy: S,
    config: BacktestConfig,
    fill_model: FillModel,
    exit_rule: ExitRule,
}

impl<S: Strategy> Backtest<S> {
    /// Creates a replay of `series` driven by `strategy`.
    ///
    /// Fails before any bar is processed if the configuration is invalid,
    /// if a bar lacks an indicator the strategy requires, or if the exit
    /// rule holds a negative or non-finite threshold.
    pub fn new(series: BarSeries, strategy: S, config: BacktestConfig) -> Result<Self> {
        config.validate()?;

        let required = strategy.required_indicators();
        let required = required.iter().map(String::as_str).collect::<Vec<_>>();
        series.require_indicators(&required)?;

        let exit_rule = strategy.exit_rule();
        if let Some(take_profit) = exit_rule.take_profit {
            check_rate("take_profit", take_profit)?;
        }
        if let Some(stop_loss) = exit_rule.stop_loss {
            check_rate("stop_loss", stop_loss)?;
        }

        Ok(Self {
            fill_model: config.fill_model()?,
            series,
            strategy,
            config,
            exit_rule,
        })
    }

    pub fn series(&self) -> &BarSeries {
        &self.series
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Runs the replay to the last bar and derives the report.
    pub fn run(mut self) -> Result<BacktestResult> {
        let instrument = self.config.instrument.clone();
        let span = info_span!("replay", instrument = %instrument);
        let _guard = span.enter();

        info!(
            bars = self.series.len(),
            initial_capital = self.config.initial_capital,
            commission = self.fill_model.commission(),
            slippage = self.fill_model.slippage(),
            "replay started"
        );

        let mut ledger = Ledger::new(self.config.initial_capital)?;
        let mut equity = Vec::with_capacity(self.series.len());
        let mut pending: Vec<Order> = Vec::new();

        for index in 0..self.series.len() {
            let bar = &self.series[index];

            for order in pending.drain(..) {
                match self.fill_model.fill(&order, bar) {
                    Some(fill) => {
                        ledger.apply(fill);
                    }
                    None => debug!(
                        order = order.id(),
                        side = ?order.side(),
                        limit = ?order.limit_price(),
                        low = bar.low(),
                        high = bar.high(),
                        "limit order discarded: price not touched"
                    ),
                }
            }

            self.auto_exit(&mut ledger, bar);

            let ctx = Context::new(&self.series[..=index], &ledger, &instrument);
            for order in self.strategy.decide(&ctx)? {
                pending.push(self.stamp(order, bar)?);
            }

            let sample = EquitySample {
                timestamp: bar.timestamp(),
                equity: ledger.equity(bar.close()),
                cash: ledger.cash(),
                close: bar.close(),
            };
            trace!(index, equity = sample.equity, cash = sample.cash, "equity sample");
            equity.push(sample);
        }

        if !pending.is_empty() {
            debug!(count = pending.len(), "orders left pending after the last bar are dropped");
        }

        let metrics = Metrics::new(&equity, ledger.trades(), ledger.initial_capital(), self.config.risk_free_rate);
        let trade_stats = match self.config.trade_stats {
            TradeStatsMode::Alternating => TradeStats::alternating(ledger.trades()),
            TradeStatsMode::RoundTrips => TradeStats::round_trips(ledger.round_trips()),
        };
        let report = metrics.report_with(trade_stats);

        info!(
            trades = ledger.trades().len(),
            final_equity = report.final_equity,
            total_return = report.total_return,
            "replay finished"
        );

        Ok(BacktestResult {
            trades: ledger.trades().to_vec(),
            round_trips: ledger.round_trips().to_vec(),
            open_positions: ledger.positions().cloned().collect(),
            final_cash: ledger.cash(),
            pending_orders_dropped: pending.len(),
            equity,
            report,
        })
    }

    /// Closes the open position at the bar close when the exit rule is breached.
    fn auto_exit(&self, ledger: &mut Ledger, bar: &Bar) {
        if self.exit_rule.is_empty() {
            return;
        }
        let Some(position) = ledger.position(&self.config.instrument) else {
            return;
        };
        let Some(reason) = self.exit_rule.triggered(position, bar.close()) else {
            return;
        };

        let side = position.side().closing_side();
        let size = position.size();
        debug!(
            ?reason,
            entry_price = position.entry_price(),
            close = bar.close(),
            "exit rule triggered"
        );

        match Order::market(side, size) {
            Ok(order) => {
                let order = order.on(self.config.instrument.as_str()).at(bar.timestamp());
                let fill = self.fill_model.fill_at(&order, bar.close(), bar.timestamp());
                ledger.apply(fill);
            }
            // the ledger never holds an empty position
            Err(err) => debug!(%err, "exit order rejected"),
        }
    }

    /// Fills in the instrument and timestamp a strategy left empty.
    fn stamp(&self, order: Order, bar: &Bar) -> Result<Order> {
        let order = if order.instrument().is_empty() {
            order.on(self.config.instrument.as_str())
        } else if order.instrument() != self.config.instrument {
            return Err(Error::ForeignInstrument {
                expected: self.config.instrument.clone(),
                got: order.instrument().to_string(),
            });
        } else {
            order
        };

        if order.timestamp() == DateTime::<Utc>::default() {
            Ok(order.at(bar.timestamp()))
        } else {
            Ok(order)
        }
    }
}
