//! Performance metrics for a finished replay.
//!
//! Everything here is a pure function of the equity curve, the trade list,
//! the initial capital and the risk-free rate. Returns are annualized with
//! 365 periods per year (markets that trade every calendar day).
//!
//! Degenerate inputs (no returns, zero variance, no drawdown, no trades)
//! give `0.0` instead of NaN. The one exception is the profit factor, which
//! is `f64::INFINITY` when there are winners and no gross loss.
//!
//! CAGR and Calmar saturate at `f64::MAX`: compounding a large gain over a
//! fraction of a year overflows otherwise.

use std::fmt;

use chrono::Datelike;

use crate::engine::{EquitySample, OrderSide, RoundTrip, Trade};

/// Periods per year used for annualization.
pub const PERIODS_PER_YEAR: f64 = 365.0;

/// How trade-level statistics are derived.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradeStatsMode {
    /// Trades `2k` and `2k + 1` form an entry/exit pair; only buy-then-sell
    /// pairs are scored. Misattributes partial closes, flips and pyramiding.
    #[default]
    Alternating,
    /// Each realized reduction, close or flip recorded by the ledger is one trade.
    RoundTrips,
}

/// Trade-quality statistics over a list of per-trade fractional returns.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TradeStats {
    pub num_trades: usize,
    pub num_winning_trades: usize,
    pub num_losing_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_trade: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub expectancy: f64,
}

impl TradeStats {
    /// Scores trades by their fractional returns. A return `<= 0` is a loss.
    pub fn from_returns(returns: &[f64]) -> Self {
        if returns.is_empty() {
            return Self::default();
        }

        let (wins, losses): (Vec<f64>, Vec<f64>) = returns.iter().partition(|r| **r > 0.0);
        let num_trades = returns.len();
        let win_rate = wins.len() as f64 / num_trades as f64;

        let gross_profit = wins.iter().sum::<f64>();
        let gross_loss = losses.iter().sum::<f64>().abs();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            f64::INFINITY
        };

        let avg_win = mean(&wins);
        let avg_loss = mean(&losses);

        Self {
            num_trades,
            num_winning_trades: wins.len(),
            num_losing_trades: losses.len(),
            win_rate,
            profit_factor,
            avg_trade: mean(returns),
            avg_win,
            avg_loss,
            expectancy: win_rate * avg_win - (1.0 - win_rate) * avg_loss.abs(),
        }
    }

    /// Pairs trades by alternation and scores the buy-then-sell pairs.
    pub fn alternating(trades: &[Trade]) -> Self {
        Self::from_returns(&alternating_returns(trades))
    }

    /// Scores the realized round trips recorded by the ledger.
    pub fn round_trips(round_trips: &[RoundTrip]) -> Self {
        let returns = round_trips.iter().map(|rt| rt.return_pct).collect::<Vec<_>>();
        Self::from_returns(&returns)
    }
}

/// `(exit − entry) / entry` for every `(2k, 2k + 1)` trade pair whose entry
/// is a buy and whose exit is a sell. Other pairs are skipped.
pub fn alternating_returns(trades: &[Trade]) -> Vec<f64> {
    trades
        .chunks_exact(2)
        .filter(|pair| pair[0].side == OrderSide::Buy && pair[1].side == OrderSide::Sell)
        .map(|pair| (pair[1].price - pair[0].price) / pair[0].price)
        .collect()
}

/// The performance report of one replay.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub total_return: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Longest run of bars spent strictly below the running peak.
    pub max_drawdown_duration: usize,
    pub calmar_ratio: f64,
    pub final_equity: f64,
    pub total_fees: f64,
    /// Number of fills, as opposed to `trade_stats.num_trades` (scored trades).
    pub num_fills: usize,
    pub trade_stats: TradeStats,
}

/// Calculator over one equity curve and trade list.
///
/// ```rust
/// use bar_replay::prelude::*;
///
/// let metrics = Metrics::new(&[], &[], 10_000.0, 0.0);
/// let report = metrics.report();
/// assert_eq!(report.final_equity, 10_000.0);
/// assert_eq!(report.sharpe_ratio, 0.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Metrics<'a> {
    equity: &'a [EquitySample],
    trades: &'a [Trade],
    initial_capital: f64,
    risk_free_rate: f64,
}

impl<'a> Metrics<'a> {
    pub fn new(equity: &'a [EquitySample], trades: &'a [Trade], initial_capital: f64, risk_free_rate: f64) -> Self {
        Self {
            equity,
            trades,
            initial_capital,
            risk_free_rate,
        }
    }

    /// Last equity value, or the initial capital on an empty curve.
    pub fn final_equity(&self) -> f64 {
        self.equity.last().map_or(self.initial_capital, |s| s.equity)
    }

    /// Period-over-period returns of the equity curve. A zero previous
    /// equity gives a zero return.
    pub fn returns(&self) -> Vec<f64> {
        self.equity
            .windows(2)
            .map(|w| {
                let previous = w[0].equity;
                if previous == 0.0 {
                    0.0
                } else {
                    w[1].equity / previous - 1.0
                }
            })
            .collect()
    }

    /// `final_equity / initial_capital − 1`.
    pub fn total_return(&self) -> f64 {
        if self.initial_capital <= 0.0 {
            return 0.0;
        }
        self.final_equity() / self.initial_capital - 1.0
    }

    /// Compound annual growth rate over `periods / 365` years.
    pub fn cagr(&self) -> f64 {
        let periods = self.equity.len().saturating_sub(1);
        if periods == 0 {
            return 0.0;
        }
        let growth = 1.0 + self.total_return();
        if growth <= 0.0 {
            return -1.0;
        }
        let years = periods as f64 / PERIODS_PER_YEAR;
        saturate(growth.powf(1.0 / years) - 1.0)
    }

    /// Annualized standard deviation of returns.
    pub fn volatility(&self) -> f64 {
        std_dev(&self.returns()) * PERIODS_PER_YEAR.sqrt()
    }

    fn excess_return(&self, returns: &[f64]) -> f64 {
        mean(returns) * PERIODS_PER_YEAR - self.risk_free_rate
    }

    /// Annualized excess return over annualized volatility.
    pub fn sharpe_ratio(&self) -> f64 {
        let returns = self.returns();
        let volatility = std_dev(&returns) * PERIODS_PER_YEAR.sqrt();
        if volatility > 0.0 {
            self.excess_return(&returns) / volatility
        } else {
            0.0
        }
    }

    /// Annualized excess return over the annualized deviation of the
    /// strictly negative returns.
    pub fn sortino_ratio(&self) -> f64 {
        let returns = self.returns();
        let downside = returns.iter().copied().filter(|r| *r < 0.0).collect::<Vec<_>>();
        let downside_dev = std_dev(&downside) * PERIODS_PER_YEAR.sqrt();
        if downside_dev > 0.0 {
            self.excess_return(&returns) / downside_dev
        } else {
            0.0
        }
    }

    /// Drawdown from the running peak at each sample (`<= 0`).
    pub fn drawdowns(&self) -> Vec<f64> {
        let mut peak = f64::NEG_INFINITY;
        self.equity
            .iter()
            .map(|s| {
                peak = peak.max(s.equity);
                if peak > 0.0 { (s.equity - peak) / peak } else { 0.0 }
            })
            .collect()
    }

    /// Deepest drawdown as a negative fraction, or `0.0`.
    pub fn max_drawdown(&self) -> f64 {
        self.drawdowns().into_iter().fold(0.0, f64::min)
    }

    /// Longest run of consecutive samples strictly below the running peak.
    pub fn max_drawdown_duration(&self) -> usize {
        let mut current = 0;
        let mut longest = 0;
        for drawdown in self.drawdowns() {
            if drawdown < 0.0 {
                current += 1;
                longest = longest.max(current);
            } else {
                current = 0;
            }
        }
        longest
    }

    /// CAGR over the magnitude of the max drawdown.
    pub fn calmar_ratio(&self) -> f64 {
        let max_drawdown = self.max_drawdown();
        if max_drawdown == 0.0 {
            return 0.0;
        }
        saturate(self.cagr() / max_drawdown.abs())
    }

    /// Builds the report with trade statistics paired by alternation.
    pub fn report(&self) -> Report {
        self.report_with(TradeStats::alternating(self.trades))
    }

    /// Builds the report with the given trade statistics.
    pub fn report_with(&self, trade_stats: TradeStats) -> Report {
        Report {
            total_return: self.total_return(),
            cagr: self.cagr(),
            volatility: self.volatility(),
            sharpe_ratio: self.sharpe_ratio(),
            sortino_ratio: self.sortino_ratio(),
            max_drawdown: self.max_drawdown(),
            max_drawdown_duration: self.max_drawdown_duration(),
            calmar_ratio: self.calmar_ratio(),
            final_equity: self.final_equity(),
            total_fees: self.trades.iter().map(|t| t.fee).sum(),
            num_fills: self.trades.len(),
            trade_stats,
        }
    }
}

/// Return of one calendar month of the equity curve.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    pub value: f64,
}

/// Month-end to month-end returns. The first month is measured from the
/// first sample of the curve.
pub fn monthly_returns(equity: &[EquitySample]) -> Vec<MonthlyReturn> {
    let Some(first) = equity.first() else {
        return Vec::new();
    };

    // (year, month, last equity of the month)
    let mut month_ends: Vec<(i32, u32, f64)> = Vec::new();
    for sample in equity {
        let key = (sample.timestamp.year(), sample.timestamp.month());
        match month_ends.last_mut() {
            Some(last) if (last.0, last.1) == key => last.2 = sample.equity,
            _ => month_ends.push((key.0, key.1, sample.equity)),
        }
    }

    let mut previous = first.equity;
    month_ends
        .into_iter()
        .map(|(year, month, close)| {
            let value = if previous == 0.0 { 0.0 } else { close / previous - 1.0 };
            previous = close;
            MonthlyReturn { year, month, value }
        })
        .collect()
}

fn saturate(value: f64) -> f64 {
    value.clamp(f64::MIN, f64::MAX)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1); `0.0` below two observations.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.trade_stats;
        writeln!(f, "=== Backtest Report ===")?;
        writeln!(f, "Total Return: {:.2}%", self.total_return * 100.0)?;
        writeln!(f, "CAGR: {:.2}%", self.cagr * 100.0)?;
        writeln!(f, "Volatility: {:.2}%", self.volatility * 100.0)?;
        writeln!(f, "Sharpe Ratio: {:.2}", self.sharpe_ratio)?;
        writeln!(f, "Sortino Ratio: {:.2}", self.sortino_ratio)?;
        writeln!(f, "Max Drawdown: {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "Max DD Duration: {} bars", self.max_drawdown_duration)?;
        writeln!(f, "Calmar Ratio: {:.2}", self.calmar_ratio)?;
        writeln!(f)?;
        writeln!(f, "Win Rate: {:.2}%", stats.win_rate * 100.0)?;
        writeln!(f, "Profit Factor: {:.2}", stats.profit_factor)?;
        writeln!(f, "Avg Trade: {:.2}%", stats.avg_trade * 100.0)?;
        writeln!(f, "Avg Win: {:.2}%", stats.avg_win * 100.0)?;
        writeln!(f, "Avg Loss: {:.2}%", stats.avg_loss * 100.0)?;
        writeln!(f, "Trades: {} ({} won, {} lost)", stats.num_trades, stats.num_winning_trades, stats.num_losing_trades)?;
        writeln!(f, "Expectancy: {:.4}", stats.expectancy)?;
        writeln!(f)?;
        writeln!(f, "Fills: {}", self.num_fills)?;
        writeln!(f, "Fees paid: {:.2}", self.total_fees)?;
        writeln!(f, "Final Equity: {:.2}", self.final_equity)
    }
}

#[cfg(test)]
fn curve(values: &[f64]) -> Vec<EquitySample> {
    use chrono::{DateTime, Duration};

    let start = DateTime::from_timestamp_secs(1672531200).unwrap();
    values
        .iter()
        .enumerate()
        .map(|(i, &equity)| EquitySample {
            timestamp: start + Duration::days(i as i64),
            equity,
            cash: equity,
            close: 100.0,
        })
        .collect()
}

#[cfg(test)]
fn trade(side: OrderSide, price: f64) -> Trade {
    Trade {
        side,
        size: 1.0,
        price,
        timestamp: chrono::DateTime::default(),
        instrument: "BTC-USD".into(),
        fee: 0.1,
    }
}

#[cfg(test)]
#[test]
fn total_return_and_final_equity() {
    let equity = curve(&[10_000.0, 10_500.0, 11_000.0]);
    let metrics = Metrics::new(&equity, &[], 10_000.0, 0.0);
    assert_eq!(metrics.final_equity(), 11_000.0);
    assert!((metrics.total_return() - 0.1).abs() < 1e-12);
    assert_eq!(metrics.returns().len(), 2);
}

#[cfg(test)]
#[test]
fn cagr_over_one_year() {
    // 366 samples = 365 returns = one year
    let mut values = vec![10_000.0; 366];
    values[365] = 12_000.0;
    let equity = curve(&values);
    let metrics = Metrics::new(&equity, &[], 10_000.0, 0.0);
    assert!((metrics.cagr() - 0.2).abs() < 1e-9);
}

#[cfg(test)]
#[test]
fn cagr_on_wiped_out_account() {
    let equity = curve(&[10_000.0, 0.0]);
    let metrics = Metrics::new(&equity, &[], 10_000.0, 0.0);
    assert_eq!(metrics.cagr(), -1.0);
    assert_eq!(metrics.returns(), vec![-1.0]);
}

#[cfg(test)]
#[test]
fn short_explosive_growth_stays_finite() {
    let equity = curve(&[10_000.0, 100_000.0]);
    let metrics = Metrics::new(&equity, &[], 10_000.0, 0.0);
    assert_eq!(metrics.cagr(), f64::MAX);

    let equity = curve(&[10_000.0, 1e9, 9e8]);
    let report = Metrics::new(&equity, &[], 10_000.0, 0.0).report();
    assert_eq!(report.cagr, f64::MAX);
    assert_eq!(report.calmar_ratio, f64::MAX);
}

#[cfg(test)]
#[test]
fn max_drawdown() {
    let equity = curve(&[10_000.0, 12_000.0, 9_000.0, 11_000.0, 12_500.0]);
    let metrics = Metrics::new(&equity, &[], 10_000.0, 0.0);
    // (9000 - 12000) / 12000
    assert!((metrics.max_drawdown() + 0.25).abs() < 1e-12);
    assert_eq!(metrics.max_drawdown_duration(), 2);
}

#[cfg(test)]
#[test]
fn drawdown_duration_takes_longest_run() {
    let equity = curve(&[100.0, 90.0, 100.0, 99.0, 98.0, 97.0, 101.0, 100.0]);
    let metrics = Metrics::new(&equity, &[], 100.0, 0.0);
    assert_eq!(metrics.max_drawdown_duration(), 3);
}

#[cfg(test)]
#[test]
fn monotonic_curve_has_no_drawdown() {
    let equity = curve(&[100.0, 101.0, 101.0, 105.0, 110.0]);
    let metrics = Metrics::new(&equity, &[], 100.0, 0.0);
    assert_eq!(metrics.max_drawdown(), 0.0);
    assert_eq!(metrics.max_drawdown_duration(), 0);
    assert_eq!(metrics.calmar_ratio(), 0.0);
    assert_eq!(metrics.sortino_ratio(), 0.0);
}

#[cfg(test)]
#[test]
fn flat_curve_is_degenerate_not_nan() {
    let equity = curve(&[100.0, 100.0, 100.0]);
    let report = Metrics::new(&equity, &[], 100.0, 0.02).report();
    assert_eq!(report.volatility, 0.0);
    assert_eq!(report.sharpe_ratio, 0.0);
    assert_eq!(report.sortino_ratio, 0.0);
    assert_eq!(report.calmar_ratio, 0.0);
    assert_eq!(report.trade_stats, TradeStats::default());
}

#[cfg(test)]
#[test]
fn empty_curve() {
    let report = Metrics::new(&[], &[], 100.0, 0.0).report();
    assert_eq!(report.final_equity, 100.0);
    assert_eq!(report.total_return, 0.0);
    assert_eq!(report.cagr, 0.0);
    assert_eq!(report.max_drawdown_duration, 0);
}

#[cfg(test)]
#[test]
fn sharpe_and_sortino() {
    let equity = curve(&[100.0, 102.0, 101.0, 104.0, 103.0, 106.0]);
    let metrics = Metrics::new(&equity, &[], 100.0, 0.0);
    let returns = metrics.returns();

    let m = mean(&returns);
    let sd = std_dev(&returns);
    let expected_sharpe = (m * 365.0) / (sd * 365.0_f64.sqrt());
    assert!((metrics.sharpe_ratio() - expected_sharpe).abs() < 1e-9);
    assert!(metrics.sharpe_ratio() > 0.0);

    let downside = returns.iter().copied().filter(|r| *r < 0.0).collect::<Vec<_>>();
    let expected_sortino = (m * 365.0) / (std_dev(&downside) * 365.0_f64.sqrt());
    assert!((metrics.sortino_ratio() - expected_sortino).abs() < 1e-9);
}

#[cfg(test)]
#[test]
fn risk_free_rate_lowers_sharpe() {
    let equity = curve(&[100.0, 102.0, 101.0, 104.0]);
    let without = Metrics::new(&equity, &[], 100.0, 0.0).sharpe_ratio();
    let with = Metrics::new(&equity, &[], 100.0, 0.05).sharpe_ratio();
    assert!(with < without);
}

#[cfg(test)]
#[test]
fn std_dev_is_sample_deviation() {
    assert_eq!(std_dev(&[1.0]), 0.0);
    assert!((std_dev(&[1.0, 2.0, 3.0, 4.0]) - 1.2909944487358056).abs() < 1e-12);
}

#[cfg(test)]
#[test]
fn alternating_pairs() {
    let trades = vec![
        trade(OrderSide::Buy, 100.0),
        trade(OrderSide::Sell, 110.0),
        trade(OrderSide::Buy, 100.0),
        trade(OrderSide::Sell, 95.0),
        // sell-then-buy pair is skipped
        trade(OrderSide::Sell, 100.0),
        trade(OrderSide::Buy, 90.0),
        // unpaired trailing entry is ignored
        trade(OrderSide::Buy, 100.0),
    ];
    let returns = alternating_returns(&trades);
    assert_eq!(returns.len(), 2);
    assert!((returns[0] - 0.1).abs() < 1e-12);
    assert!((returns[1] + 0.05).abs() < 1e-12);

    let stats = TradeStats::alternating(&trades);
    assert_eq!(stats.num_trades, 2);
    assert_eq!(stats.num_winning_trades, 1);
    assert_eq!(stats.num_losing_trades, 1);
    assert_eq!(stats.win_rate, 0.5);
    assert!((stats.profit_factor - 2.0).abs() < 1e-9);
    // 0.5 * 0.1 - 0.5 * 0.05
    assert!((stats.expectancy - 0.025).abs() < 1e-12);
}

#[cfg(test)]
#[test]
fn profit_factor_without_losers() {
    let stats = TradeStats::from_returns(&[0.1, 0.2]);
    assert_eq!(stats.profit_factor, f64::INFINITY);
    assert_eq!(stats.win_rate, 1.0);
}

#[cfg(test)]
#[test]
fn breakeven_trade_is_a_loss() {
    let stats = TradeStats::from_returns(&[0.0, 0.1]);
    assert_eq!(stats.num_losing_trades, 1);
    // gross loss is zero, so the factor is unbounded
    assert_eq!(stats.profit_factor, f64::INFINITY);
}

#[cfg(test)]
#[test]
fn round_trip_stats() {
    use crate::engine::PositionSide;

    let rt = |side, return_pct| RoundTrip {
        instrument: "BTC-USD".into(),
        side,
        size: 1.0,
        entry_price: 100.0,
        exit_price: 100.0,
        entry_time: chrono::DateTime::default(),
        exit_time: chrono::DateTime::default(),
        pnl: return_pct * 100.0,
        return_pct,
    };
    let stats = TradeStats::round_trips(&[rt(PositionSide::Short, 0.04), rt(PositionSide::Long, -0.02)]);
    assert_eq!(stats.num_trades, 2);
    assert!((stats.profit_factor - 2.0).abs() < 1e-9);
}

#[cfg(test)]
#[test]
fn report_counts_fills_and_fees() {
    let equity = curve(&[100.0, 101.0]);
    let trades = vec![trade(OrderSide::Buy, 100.0), trade(OrderSide::Sell, 101.0)];
    let report = Metrics::new(&equity, &trades, 100.0, 0.0).report();
    assert_eq!(report.num_fills, 2);
    assert!((report.total_fees - 0.2).abs() < 1e-12);
    assert!(report.to_string().contains("Final Equity: 101.00"));
}

#[cfg(test)]
#[test]
fn monthly_returns_by_calendar_month() {
    // 2023-01-30 .. 2023-02-02
    let start = chrono::DateTime::from_timestamp_secs(1675036800).unwrap();
    let equity = [100.0, 110.0, 121.0, 133.1]
        .iter()
        .enumerate()
        .map(|(i, &equity)| EquitySample {
            timestamp: start + chrono::Duration::days(i as i64),
            equity,
            cash: equity,
            close: 1.0,
        })
        .collect::<Vec<_>>();

    let months = monthly_returns(&equity);
    assert_eq!(months.len(), 2);
    assert_eq!((months[0].year, months[0].month), (2023, 1));
    assert!((months[0].value - 0.1).abs() < 1e-12);
    assert_eq!(months[1].month, 2);
    assert!((months[1].value - 0.21).abs() < 1e-9);
}

#[cfg(test)]
mod properties {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        /// Deriving twice from the same inputs gives the same report.
        #[test]
        fn report_is_idempotent(values in prop::collection::vec(1.0..1e6_f64, 0..200)) {
            let equity = curve(&values);
            let metrics = Metrics::new(&equity, &[], 1_000.0, 0.01);
            let first = metrics.report();
            let second = metrics.report();
            prop_assert_eq!(first, second);
        }

        /// A non-decreasing curve never shows a drawdown.
        #[test]
        fn rising_curve_has_no_drawdown(steps in prop::collection::vec(0.0..100.0_f64, 1..100)) {
            let values = steps
                .iter()
                .scan(1_000.0, |acc, step| {
                    *acc += step;
                    Some(*acc)
                })
                .collect::<Vec<_>>();
            let equity = curve(&values);
            let metrics = Metrics::new(&equity, &[], 1_000.0, 0.0);
            prop_assert_eq!(metrics.max_drawdown(), 0.0);
            prop_assert_eq!(metrics.max_drawdown_duration(), 0);
        }

        /// Drawdowns are fractions in `[-1, 0]` for positive equity.
        #[test]
        fn drawdown_is_bounded(values in prop::collection::vec(1.0..1e6_f64, 1..200)) {
            let equity = curve(&values);
            let max_drawdown = Metrics::new(&equity, &[], 1_000.0, 0.0).max_drawdown();
            prop_assert!((-1.0..=0.0).contains(&max_drawdown));
        }
    }
}
