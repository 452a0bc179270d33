use bar_replay::prelude::*;
use tracing_subscriber::EnvFilter;

/// Enters long whenever flat after two rising closes; exits are left to
/// the take-profit / stop-loss rule.
struct TwoUpCloses;

impl Strategy for TwoUpCloses {
    fn decide(&mut self, ctx: &Context<'_>) -> Result<Vec<Order>> {
        let [a, b, c] = ctx.lookback(3) else {
            return Ok(Vec::new());
        };
        if ctx.position().is_none() && a.close() < b.close() && b.close() < c.close() {
            let size = ctx.cash() * 0.9 / ctx.close();
            return Ok(vec![ctx.buy(size)?]);
        }
        Ok(Vec::new())
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let series = BarSeries::new(generate_bars(365, 42)?)?;
    let config = BacktestConfig::default().with_initial_capital(10_000.0).with_slippage(0.0005);
    let strategy = WithExits::new(TwoUpCloses, Some(5.0), Some(3.0));

    let result = Backtest::new(series, strategy, config)?.run()?;

    println!("{}", result.report);
    println!("round trips {}", result.round_trips.len());
    for rt in result.round_trips.iter().take(5) {
        println!(
            "{:?} {:.4} @ {:.2} -> {:.2} ({:+.2}%)",
            rt.side,
            rt.size,
            rt.entry_price,
            rt.exit_price,
            rt.return_pct * 100.0
        );
    }
    if let Some(position) = result.open_positions.first() {
        println!("still open: {:?} {:.4} @ {:.2}", position.side(), position.size(), position.entry_price());
    }

    Ok(())
}
