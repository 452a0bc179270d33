//! Strategy parameter sweeps.
//!
//! The `Optimizer` runs one isolated replay per parameter combination, in
//! parallel. Every replay gets its own ledger and strategy instance; the bar
//! series is shared read-only. The `ParameterCombination` trait defines the
//! combinations to test.

use std::marker::PhantomData;

use rayon::prelude::*;

use crate::{
    config::BacktestConfig,
    engine::{Backtest, BarSeries, Strategy},
    errors::Result,
    metrics::Report,
};

/// Trait defining how to generate parameter combinations for optimization.
///
/// The associated type `Output` is a single combination (e.g. a tuple of values).
pub trait ParameterCombination: Sync {
    /// Type representing a single parameter combination (e.g., `(usize, f64)`).
    type Output: Clone + Send + Sync;

    /// Generates all parameter combinations to test.
    fn generate() -> Vec<Self::Output>;
}

/// Runs a replay for each parameter combination of `PC`.
#[derive(Debug, Clone)]
pub struct Optimizer<PC: ParameterCombination> {
    series: BarSeries,
    config: BacktestConfig,
    _marker: PhantomData<PC>,
}

impl<PC: ParameterCombination> Optimizer<PC> {
    /// Creates an optimizer replaying `series` with `config`.
    pub fn new(series: BarSeries, config: BacktestConfig) -> Self {
        Self {
            series,
            config,
            _marker: PhantomData,
        }
    }

    /// Builds a strategy for each combination with `build`, replays it, and
    /// returns every combination with its report, in generation order.
    ///
    /// # Errors
    /// The first error raised by `build` or by a replay.
    pub fn with<S, B>(&self, build: B) -> Result<Vec<(PC::Output, Report)>>
    where
        S: Strategy,
        B: Fn(&PC::Output) -> Result<S> + Sync,
    {
        let combinations = PC::generate();
        let chunk_size = combinations.len().div_ceil(num_cpus::get()).max(1);

        combinations
            .par_chunks(chunk_size)
            .map::<_, Result<_>>(|par_combinations| {
                let mut local_results = Vec::with_capacity(par_combinations.len());
                for param_set in par_combinations {
                    let strategy = build(param_set)?;
                    let result = Backtest::new(self.series.clone(), strategy, self.config.clone())?.run()?;
                    local_results.push((param_set.clone(), result.report));
                }
                Ok(local_results)
            })
            .collect::<Result<Vec<_>>>()
            .map(|chunks| chunks.into_iter().flatten().collect())
    }
}

#[cfg(test)]
struct Lookbacks;

#[cfg(test)]
impl ParameterCombination for Lookbacks {
    type Output = (usize, f64);

    fn generate() -> Vec<Self::Output> {
        (2..=10)
            .flat_map(|lookback| [1.0, 2.0, 5.0].map(move |stop_loss| (lookback, stop_loss)))
            .collect()
    }
}

/// Goes long when the close is above the close `lookback` bars ago, flat otherwise.
#[cfg(test)]
fn momentum(lookback: usize) -> impl Strategy {
    use crate::engine::from_fn;

    from_fn(move |ctx| {
        let window = ctx.lookback(lookback + 1);
        if window.len() <= lookback {
            return Ok(Vec::new());
        }
        let rising = ctx.close() > window[0].close();
        match (rising, ctx.position_size() > 0.0) {
            (true, false) => Ok(vec![ctx.buy(ctx.cash() * 0.5 / ctx.close())?]),
            (false, true) => Ok(ctx.close_position()?.into_iter().collect()),
            _ => Ok(Vec::new()),
        }
    })
}

#[cfg(test)]
#[test]
fn sweep_keeps_generation_order() {
    use crate::engine::WithExits;

    let series = BarSeries::new(crate::utils::generate_bars(120, 42).unwrap()).unwrap();
    let optimizer = Optimizer::<Lookbacks>::new(series.clone(), BacktestConfig::default());

    let results = optimizer
        .with(|&(lookback, stop_loss)| Ok(WithExits::new(momentum(lookback), None, Some(stop_loss))))
        .unwrap();

    let combinations = Lookbacks::generate();
    assert_eq!(results.len(), combinations.len());
    for ((params, _), expected) in results.iter().zip(&combinations) {
        assert_eq!(params, expected);
    }

    // a sweep entry equals the same replay run on its own
    let (params, report) = &results[4];
    let single = Backtest::new(
        series,
        WithExits::new(momentum(params.0), None, Some(params.1)),
        BacktestConfig::default(),
    )
    .unwrap()
    .run()
    .unwrap();
    assert_eq!(report, &single.report);
}

#[cfg(test)]
#[test]
fn sweep_propagates_build_errors() {
    use crate::{engine::BuyAndHold, errors::Error};

    let series = BarSeries::new(crate::utils::generate_bars(10, 1).unwrap()).unwrap();
    let optimizer = Optimizer::<Lookbacks>::new(series, BacktestConfig::default());

    let result = optimizer.with(|&(lookback, _)| {
        if lookback == 7 {
            return Err(Error::Strategy("bad lookback".into()));
        }
        Ok(BuyAndHold::default())
    });
    assert!(matches!(result, Err(Error::Strategy(_))));
}
