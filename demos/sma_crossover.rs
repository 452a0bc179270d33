use bar_replay::prelude::*;
use ta::{Next, indicators::SimpleMovingAverage};

const FAST: &str = "sma_fast";
const SLOW: &str = "sma_slow";

/// Annotates every bar with fast and slow moving averages of the close.
fn annotate(bars: &mut [Bar], fast: usize, slow: usize) -> std::result::Result<(), ta::errors::TaError> {
    let mut fast_sma = SimpleMovingAverage::new(fast)?;
    let mut slow_sma = SimpleMovingAverage::new(slow)?;
    for bar in bars {
        let close = bar.close();
        bar.set_indicator(FAST, fast_sma.next(close));
        bar.set_indicator(SLOW, slow_sma.next(close));
    }
    Ok(())
}

/// Long while the fast average is above the slow one, flat otherwise.
struct SmaCrossover {
    warmup: usize,
}

impl Strategy for SmaCrossover {
    fn decide(&mut self, ctx: &Context<'_>) -> Result<Vec<Order>> {
        let Some(bar) = ctx.bar() else {
            return Ok(Vec::new());
        };
        if ctx.index() < self.warmup {
            return Ok(Vec::new());
        }
        let (Some(fast), Some(slow)) = (bar.indicator(FAST), bar.indicator(SLOW)) else {
            return Ok(Vec::new());
        };

        let long = ctx.position_size() > 0.0;
        if fast > slow && !long {
            let size = ctx.cash() * 0.95 / ctx.close();
            return Ok(vec![ctx.buy(size)?]);
        }
        if fast < slow && long {
            return Ok(ctx.close_position()?.into_iter().collect());
        }
        Ok(Vec::new())
    }

    fn required_indicators(&self) -> Vec<String> {
        vec![FAST.to_string(), SLOW.to_string()]
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut bars = generate_bars(730, 7)?;
    annotate(&mut bars, 10, 30)?;
    let series = BarSeries::new(bars)?;

    let config = BacktestConfig::default().with_trade_stats(TradeStatsMode::RoundTrips);
    let result = Backtest::new(series.clone(), SmaCrossover { warmup: 30 }, config.clone())?.run()?;
    let benchmark = Backtest::new(series, BuyAndHold::default(), config)?.run()?;

    println!("{}", result.report);
    println!("buy and hold {:.2}%", benchmark.report.total_return * 100.0);
    println!();
    for month in monthly_returns(&result.equity) {
        println!("{}-{:02} {:+.2}%", month.year, month.month, month.value * 100.0);
    }

    Ok(())
}
