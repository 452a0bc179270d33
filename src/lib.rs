//! # bar-replay: replay price history against a trading strategy
//!
//! **bar-replay** answers one question: *if this rule set had traded this
//! price history, what would have happened?* It walks a series of OHLCV bars,
//! executes the orders a strategy returns under a deterministic fill model,
//! keeps a cash/position ledger, and derives standard performance statistics
//! from the resulting equity curve.
//!
//! ## Core Components
//! | Component       | Description                                                                     |
//! |-----------------|---------------------------------------------------------------------------------|
//! | **`Bar`**       | One OHLCV observation, optionally annotated with indicator columns.             |
//! | **`BarSeries`** | A validated, chronologically ordered, shareable list of bars.                   |
//! | **`Order`**     | Market or limit order returned by a strategy.                                   |
//! | **`FillModel`** | Single-bar fill rules with slippage and commission.                             |
//! | **`Ledger`**    | Cash, one position per instrument, trade history and realized round trips.      |
//! | **`Strategy`**  | The decision port: sees bars `0..=i` and the ledger, returns orders.            |
//! | **`Backtest`**  | The replay loop.                                                                |
//! | **`Metrics`**   | Return, CAGR, volatility, Sharpe, Sortino, drawdown, Calmar and trade stats.    |
//! | **`Optimizer`** | Parallel parameter sweeps *(feature `optimizer`)*.                              |
//!
//! ## Execution Rules
//! | Rule                | Behavior                                                                    |
//! |---------------------|-----------------------------------------------------------------------------|
//! | **Market order**    | Fills at the next bar open, moved against the trader by the slippage rate. |
//! | **Buy limit**       | Fills at `min(limit, open)` if `limit >= low`, otherwise discarded.        |
//! | **Sell limit**      | Fills at `max(limit, open)` if `limit <= high`, otherwise discarded.       |
//! | **Take-profit / stop-loss** | Checked at each bar close, exits at that close on the same bar.    |
//! | **Insufficient cash** | A buy costing more than the cash is dropped, no error.                   |
//! | **End of series**   | Open positions stay open; orders from the last bar are dropped.            |
//!
//! ## Getting Started
//! ```toml
//! [dependencies]
//! bar-replay = "*"
//! ta = "*"  # Optional: to annotate bars with indicator columns
//! ```
//!
//! ```rust
//! use bar_replay::prelude::*;
//!
//! let bars = generate_bars(365, 42).unwrap();
//! let series = BarSeries::new(bars).unwrap();
//!
//! let strategy = WithExits::new(BuyAndHold::default(), Some(20.0), Some(10.0));
//! let config = BacktestConfig::default().with_commission(0.001);
//!
//! let result = Backtest::new(series, strategy, config).unwrap().run().unwrap();
//! println!("{}", result.report);
//! ```
//!
//! ### Output:
//! ```bash
//! === Backtest Report ===
//! Total Return: ...%
//! CAGR: ...%
//! Volatility: ...%
//! Sharpe Ratio: ...
//! ...
//! ```
//!
//! ## Logging
//! The replay emits [`tracing`](https://crates.io/crates/tracing) events:
//! `info` at start and end, `debug` for fills, rejected orders and exit
//! triggers, `trace` for equity samples. Install any subscriber to see them.
//!
//! ## Integrations
//! | Crate          | Purpose                                                                                     |
//! |----------------|---------------------------------------------------------------------------------------------|
//! | [`rayon`](https://crates.io/crates/rayon) | Parallel parameter sweeps.                                               |
//! | [`serde`](https://crates.io/crates/serde) | Serialize results, load bars from JSON and configs from TOML.           |
//! | [`ta`](https://crates.io/crates/ta)       | Technical indicators to precompute indicator columns.                   |
//!
//! ## License
//! MIT

/// Bars, orders, fills, ledger, strategies and the replay loop.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Replay parameters.
pub mod config;

/// Performance metrics: returns, risk ratios, drawdown and trade statistics.
pub mod metrics;

/// Synthetic data and file loaders.
pub mod utils;

/// Strategy parameter optimization.
#[cfg(feature = "optimizer")]
pub mod optimizer;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::metrics::*;
    pub use crate::utils::*;

    #[cfg(feature = "optimizer")]
    pub use crate::optimizer::*;
}
