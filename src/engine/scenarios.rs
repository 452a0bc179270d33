use chrono::{DateTime, Duration};

use crate::{
    config::BacktestConfig,
    engine::*,
    errors::{Error, Result},
    metrics::TradeStatsMode,
};

fn bars(closes: &[f64]) -> Vec<Bar> {
    let start = DateTime::from_timestamp_secs(1672531200).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &price)| {
            BarBuilder::builder()
                .timestamp(start + Duration::days(i as i64))
                .open(price)
                .high(price * 1.01)
                .low(price * 0.99)
                .close(price)
                .volume(1_000.0)
                .build()
                .unwrap()
        })
        .collect()
}

fn series(closes: &[f64]) -> BarSeries {
    BarSeries::new(bars(closes)).unwrap()
}

fn frictionless() -> BacktestConfig {
    BacktestConfig::default().with_commission(0.0)
}

/// Places one market order at bar `at`.
fn once_at(at: usize, side: OrderSide, size: f64) -> impl Strategy {
    from_fn(move |ctx| {
        if ctx.index() == at {
            let order = match side {
                OrderSide::Buy => ctx.buy(size)?,
                OrderSide::Sell => ctx.sell(size)?,
            };
            return Ok(vec![order]);
        }
        Ok(Vec::new())
    })
}

fn run<S: Strategy>(closes: &[f64], strategy: S, config: BacktestConfig) -> BacktestResult {
    Backtest::new(series(closes), strategy, config).unwrap().run().unwrap()
}

#[test]
fn take_profit_closes_at_trigger_close() {
    let strategy = WithExits::new(once_at(0, OrderSide::Buy, 1.0), Some(5.0), None);
    let result = run(&[100.0, 100.0, 105.0, 105.0], strategy, frictionless());

    assert_eq!(result.trades.len(), 2);
    let (entry, exit) = (&result.trades[0], &result.trades[1]);
    assert_eq!(entry.side, OrderSide::Buy);
    assert_eq!(exit.side, OrderSide::Sell);
    assert!((entry.price - 100.0).abs() / 100.0 < 0.001);
    assert!((exit.price - 105.0).abs() / 105.0 < 0.001);
    assert!(((exit.price - entry.price) / entry.price - 0.05).abs() < 0.001);
    // the exit happens on the bar it is detected on
    assert_eq!(exit.timestamp, series(&[100.0, 100.0, 105.0])[2].timestamp());
    assert!(result.open_positions.is_empty());
}

#[test]
fn stop_loss_closes_at_trigger_close() {
    let strategy = WithExits::new(once_at(0, OrderSide::Buy, 1.0), None, Some(3.0));
    let result = run(&[100.0, 100.0, 97.0, 97.0], strategy, frictionless());

    assert_eq!(result.trades.len(), 2);
    let (entry, exit) = (&result.trades[0], &result.trades[1]);
    assert_eq!(exit.side, OrderSide::Sell);
    assert!(((entry.price - exit.price) / entry.price - 0.03).abs() < 0.001);
    assert_eq!(result.round_trips.len(), 1);
    assert!(result.round_trips[0].pnl < 0.0);
}

#[test]
fn stop_loss_on_short_position() {
    let strategy = WithExits::new(once_at(0, OrderSide::Sell, 1.0), Some(10.0), Some(3.0));
    let result = run(&[100.0, 100.0, 103.0, 103.0], strategy, frictionless());

    assert_eq!(result.trades.len(), 2);
    assert_eq!(result.trades[0].side, OrderSide::Sell);
    assert_eq!(result.trades[1].side, OrderSide::Buy);
    assert_eq!(result.round_trips[0].side, PositionSide::Short);
    assert!((result.round_trips[0].return_pct + 0.03).abs() < 1e-9);
}

#[test]
fn no_exit_rule_keeps_position_open() {
    let result = run(&[100.0, 100.0, 105.0, 97.0, 120.0], once_at(0, OrderSide::Buy, 1.0), frictionless());

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].side, OrderSide::Buy);
    assert_eq!(result.open_positions.len(), 1);
    assert_eq!(result.open_positions[0].size(), 1.0);
    // marked to market, never realized
    assert!((result.report.final_equity - (result.final_cash + 120.0)).abs() < 1e-9);
    assert!(result.round_trips.is_empty());
}

#[test]
fn insufficient_funds_leaves_ledger_untouched() {
    let config = frictionless().with_initial_capital(1_000.0);
    let result = run(&[100.0, 100.0, 100.0], once_at(0, OrderSide::Buy, 11.0), config);

    assert!(result.trades.is_empty());
    assert!(result.open_positions.is_empty());
    assert_eq!(result.final_cash, 1_000.0);
    assert!(result.equity.iter().all(|s| s.equity == 1_000.0));
}

#[test]
fn orders_fill_at_next_bar_open() {
    let bars = vec![
        BarBuilder::builder()
            .timestamp(DateTime::from_timestamp_secs(1672531200).unwrap())
            .open(100.0)
            .high(101.0)
            .low(99.0)
            .close(100.0)
            .build()
            .unwrap(),
        BarBuilder::builder()
            .timestamp(DateTime::from_timestamp_secs(1672617600).unwrap())
            .open(102.0)
            .high(104.0)
            .low(101.0)
            .close(103.0)
            .build()
            .unwrap(),
    ];
    let config = frictionless().with_slippage(0.01);
    let result = Backtest::new(BarSeries::new(bars).unwrap(), once_at(0, OrderSide::Buy, 1.0), config)
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(result.trades.len(), 1);
    assert!((result.trades[0].price - 103.02).abs() < 1e-9);
    assert_eq!(result.trades[0].timestamp, DateTime::from_timestamp_secs(1672617600).unwrap());
}

#[test]
fn flip_is_one_trade() {
    let strategy = from_fn(|ctx| match ctx.index() {
        0 => Ok(vec![ctx.sell(2.0)?]),
        1 => Ok(vec![ctx.buy(5.0)?]),
        _ => Ok(Vec::new()),
    });
    let result = run(&[100.0, 100.0, 110.0, 110.0], strategy, frictionless());

    assert_eq!(result.trades.len(), 2);
    let position = &result.open_positions[0];
    assert_eq!(position.side(), PositionSide::Long);
    assert_eq!(position.size(), 3.0);
    assert_eq!(position.entry_price(), 110.0);
}

#[test]
fn untouched_limit_is_discarded() {
    let strategy = from_fn(|ctx| {
        if ctx.index() == 0 {
            return Ok(vec![ctx.buy_limit(1.0, 90.0)?]);
        }
        Ok(Vec::new())
    });
    // bar 1 low is 99, bar 2 low is 89.1: the order must not survive to bar 2
    let result = run(&[100.0, 100.0, 90.0], strategy, frictionless());

    assert!(result.trades.is_empty());
    assert_eq!(result.pending_orders_dropped, 0);
}

#[test]
fn touched_limit_fills_at_better_of_limit_and_open() {
    let strategy = from_fn(|ctx| {
        if ctx.index() == 0 {
            return Ok(vec![ctx.buy_limit(1.0, 99.5)?]);
        }
        Ok(Vec::new())
    });
    let result = run(&[100.0, 100.0], strategy, frictionless());

    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].price, 99.5);
}

#[test]
fn last_bar_orders_are_dropped() {
    let result = run(&[100.0, 100.0, 100.0], once_at(2, OrderSide::Buy, 1.0), frictionless());
    assert!(result.trades.is_empty());
    assert_eq!(result.pending_orders_dropped, 1);
}

#[test]
fn commission_reduces_cash() {
    let config = BacktestConfig::default().with_commission(0.001);
    let result = run(&[100.0, 100.0], once_at(0, OrderSide::Buy, 1.0), config);

    assert!((result.trades[0].fee - 0.1).abs() < 1e-12);
    assert!((result.final_cash - (10_000.0 - 100.0 - 0.1)).abs() < 1e-9);
    assert!((result.report.total_fees - 0.1).abs() < 1e-12);
}

#[test]
fn equity_sample_per_bar() {
    let closes = [100.0, 101.0, 102.0, 99.0];
    let result = run(&closes, once_at(0, OrderSide::Buy, 10.0), frictionless());

    assert_eq!(result.equity.len(), closes.len());
    for (sample, close) in result.equity.iter().zip(closes) {
        assert_eq!(sample.close, close);
    }
    // bought 10 at 101 (bar 1 open), marked at 99
    assert!((result.equity[3].equity - (10_000.0 - 1_010.0 + 990.0)).abs() < 1e-9);
}

#[test]
fn strategy_sees_no_future_bars() {
    let mut seen = Vec::new();
    let strategy = from_fn(|ctx| {
        seen.push((ctx.index(), ctx.history().len()));
        Ok(Vec::new())
    });
    Backtest::new(series(&[1.0, 2.0, 3.0]), strategy, frictionless())
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(seen, vec![(0, 1), (1, 2), (2, 3)]);
}

#[test]
fn strategy_error_aborts_replay() {
    let strategy = from_fn(|ctx| {
        if ctx.index() == 1 {
            return Err(Error::Strategy("boom".into()));
        }
        Ok(Vec::new())
    });
    let result = Backtest::new(series(&[1.0, 2.0, 3.0]), strategy, frictionless())
        .unwrap()
        .run();
    assert!(matches!(result, Err(Error::Strategy(msg)) if msg == "boom"));
}

#[test]
fn foreign_instrument_is_rejected() {
    let strategy = from_fn(|_| Ok(vec![Order::market(OrderSide::Buy, 1.0)?.on("ETH-USD")]));
    let result = Backtest::new(series(&[1.0, 2.0]), strategy, frictionless())
        .unwrap()
        .run();
    assert!(matches!(result, Err(Error::ForeignInstrument { .. })));
}

#[test]
fn bare_orders_are_stamped() {
    let strategy = from_fn(|ctx| {
        if ctx.index() == 0 {
            return Ok(vec![Order::market(OrderSide::Buy, 1.0)?]);
        }
        Ok(Vec::new())
    });
    let result = run(&[100.0, 100.0], strategy, frictionless());
    assert_eq!(result.trades[0].instrument, "BTC-USD");
    assert_eq!(result.trades[0].timestamp, series(&[100.0, 100.0])[1].timestamp());
}

#[test]
fn fractional_exits_leave_no_residual_position() {
    let strategy = from_fn(|ctx| match ctx.index() {
        0 => Ok(vec![ctx.buy(0.3)?]),
        1 => Ok(vec![ctx.sell(0.1)?]),
        2 => Ok(vec![ctx.sell(0.2)?]),
        _ => Ok(Vec::new()),
    });
    let result = run(&[100.0, 100.0, 100.0, 100.0], strategy, frictionless());

    assert_eq!(result.trades.len(), 3);
    assert!(result.open_positions.is_empty());
    assert_eq!(result.round_trips.len(), 2);
    assert_eq!(result.final_cash, 10_000.0);
}

fn short_then_cover() -> impl Strategy {
    from_fn(|ctx| match ctx.index() {
        0 => Ok(vec![ctx.sell(1.0)?]),
        2 => Ok(ctx.close_position()?.into_iter().collect()),
        _ => Ok(Vec::new()),
    })
}

#[test]
fn round_trip_stats_mode() {
    let closes = [100.0, 100.0, 95.0, 90.0];

    // a sell-then-buy pair is not scored by alternation
    let alternating = run(&closes, short_then_cover(), frictionless());
    assert_eq!(alternating.trades.len(), 2);
    assert_eq!(alternating.report.trade_stats.num_trades, 0);

    let config = frictionless().with_trade_stats(TradeStatsMode::RoundTrips);
    let result = run(&closes, short_then_cover(), config);
    // short at 100, covered at 90
    assert_eq!(result.report.trade_stats.num_trades, 1);
    assert_eq!(result.report.trade_stats.num_winning_trades, 1);
}

#[test]
fn malformed_input_fails_before_replay() {
    let mut raw = bars(&[1.0, 2.0, 3.0]);
    raw.swap(1, 2);
    assert!(matches!(BarSeries::new(raw), Err(Error::NonMonotonicTimestamp { index: 2, .. })));

    struct NeedsSma;
    impl Strategy for NeedsSma {
        fn decide(&mut self, _: &Context<'_>) -> Result<Vec<Order>> {
            Ok(Vec::new())
        }

        fn required_indicators(&self) -> Vec<String> {
            vec!["sma_20".into()]
        }
    }
    let result = Backtest::new(series(&[1.0, 2.0]), NeedsSma, frictionless());
    assert!(matches!(result, Err(Error::MissingIndicator { index: 0, .. })));
}

#[test]
fn invalid_exit_rule_is_rejected() {
    let strategy = WithExits::new(BuyAndHold::default(), Some(-1.0), None);
    let result = Backtest::new(series(&[1.0, 2.0]), strategy, frictionless());
    assert!(matches!(result, Err(Error::InvalidRate { name: "take_profit", .. })));
}

#[test]
fn buy_and_hold_tracks_market() {
    let closes = [100.0, 100.0, 110.0, 121.0];
    let result = run(&closes, BuyAndHold::new(1.0), frictionless());

    assert_eq!(result.trades.len(), 1);
    assert!((result.report.total_return - 0.21).abs() < 1e-9);
    assert_eq!(result.report.max_drawdown, 0.0);
}
