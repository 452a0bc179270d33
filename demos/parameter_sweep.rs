use bar_replay::prelude::*;

struct Windows;

impl ParameterCombination for Windows {
    type Output = (usize, usize, f64);

    fn generate() -> Vec<Self::Output> {
        (5..=20)
            .step_by(5)
            .flat_map(|fast| {
                (30..=90)
                    .step_by(15)
                    .flat_map(move |slow| [2.0, 5.0, 10.0].map(move |stop_loss| (fast, slow, stop_loss)))
            })
            .collect()
    }
}

fn mean_close(bars: &[Bar]) -> f64 {
    bars.iter().map(Bar::close).sum::<f64>() / bars.len() as f64
}

/// Moving-average crossover computed from the visible history.
struct Crossover {
    fast: usize,
    slow: usize,
}

impl Strategy for Crossover {
    fn decide(&mut self, ctx: &Context<'_>) -> Result<Vec<Order>> {
        if ctx.history().len() < self.slow {
            return Ok(Vec::new());
        }
        let fast = mean_close(ctx.lookback(self.fast));
        let slow = mean_close(ctx.lookback(self.slow));
        let long = ctx.position_size() > 0.0;

        if fast > slow && !long {
            return Ok(vec![ctx.buy(ctx.cash() * 0.95 / ctx.close())?]);
        }
        if fast < slow && long {
            return Ok(ctx.close_position()?.into_iter().collect());
        }
        Ok(Vec::new())
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let series = BarSeries::new(generate_bars(1_000, 42)?)?;
    let optimizer = Optimizer::<Windows>::new(series, BacktestConfig::default());

    let mut results = optimizer.with(|&(fast, slow, stop_loss)| {
        Ok(WithExits::new(Crossover { fast, slow }, None, Some(stop_loss)))
    })?;
    results.sort_by(|(_, a), (_, b)| b.sharpe_ratio.total_cmp(&a.sharpe_ratio));

    println!("{} combinations", results.len());
    for ((fast, slow, stop_loss), report) in results.iter().take(10) {
        println!(
            "fast {fast:>2} slow {slow:>2} sl {stop_loss:>4.1}% | return {:>7.2}% sharpe {:>5.2} max dd {:>6.2}%",
            report.total_return * 100.0,
            report.sharpe_ratio,
            report.max_drawdown * 100.0
        );
    }

    Ok(())
}
