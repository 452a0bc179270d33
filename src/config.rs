//! Replay parameters.
//!
//! With the `serde` feature a [`BacktestConfig`] can be read from a TOML
//! document; missing keys fall back to their defaults:
//!
//! ```toml
//! initial_capital = 25000.0
//! commission = 0.00075
//! slippage = 0.0001
//! instrument = "ETH-USD"
//! trade_stats = "round_trips"
//! ```

use crate::{
    engine::{FillModel, check_rate},
    errors::{Error, Result},
    metrics::TradeStatsMode,
};

/// Parameters of one replay.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Starting cash.
    pub initial_capital: f64,
    /// Commission as a fraction of notional (e.g. `0.001` for 0.1%).
    pub commission: f64,
    /// Market-order slippage as a fraction of price.
    pub slippage: f64,
    /// Annual risk-free rate used by Sharpe and Sortino.
    pub risk_free_rate: f64,
    /// Identifier of the replayed instrument.
    pub instrument: String,
    /// How trade-level statistics are derived.
    pub trade_stats: TradeStatsMode,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            commission: 0.001,
            slippage: 0.0,
            risk_free_rate: 0.0,
            instrument: "BTC-USD".to_string(),
            trade_stats: TradeStatsMode::default(),
        }
    }
}

impl BacktestConfig {
    pub fn with_initial_capital(mut self, initial_capital: f64) -> Self {
        self.initial_capital = initial_capital;
        self
    }

    pub fn with_commission(mut self, commission: f64) -> Self {
        self.commission = commission;
        self
    }

    pub fn with_slippage(mut self, slippage: f64) -> Self {
        self.slippage = slippage;
        self
    }

    pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
        self.risk_free_rate = risk_free_rate;
        self
    }

    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = instrument.into();
        self
    }

    pub fn with_trade_stats(mut self, trade_stats: TradeStatsMode) -> Self {
        self.trade_stats = trade_stats;
        self
    }

    /// Checks every field; the first invalid one is reported.
    pub fn validate(&self) -> Result<()> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(Error::NegZeroCapital(self.initial_capital));
        }
        check_rate("commission", self.commission)?;
        check_rate("slippage", self.slippage)?;
        if !self.risk_free_rate.is_finite() {
            return Err(Error::InvalidRate {
                name: "risk_free_rate",
                value: self.risk_free_rate,
            });
        }
        Ok(())
    }

    /// Builds the fill model for these rates.
    pub fn fill_model(&self) -> Result<FillModel> {
        FillModel::new(self.commission, self.slippage)
    }

    /// Parses a TOML document.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    #[cfg(feature = "serde")]
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let document = std::fs::read_to_string(path)?;
        Self::from_toml_str(&document)
    }
}

#[cfg(test)]
#[test]
fn defaults() {
    let config = BacktestConfig::default();
    assert_eq!(config.initial_capital, 10_000.0);
    assert_eq!(config.commission, 0.001);
    assert_eq!(config.slippage, 0.0);
    assert_eq!(config.instrument, "BTC-USD");
    assert_eq!(config.trade_stats, TradeStatsMode::Alternating);
    assert!(config.validate().is_ok());
}

#[cfg(test)]
#[test]
fn validate_rejects_bad_values() {
    let config = BacktestConfig::default().with_initial_capital(0.0);
    assert!(matches!(config.validate(), Err(Error::NegZeroCapital(_))));

    let config = BacktestConfig::default().with_commission(-0.01);
    assert!(matches!(config.validate(), Err(Error::InvalidRate { name: "commission", .. })));

    let config = BacktestConfig::default().with_slippage(f64::INFINITY);
    assert!(matches!(config.validate(), Err(Error::InvalidRate { name: "slippage", .. })));

    let config = BacktestConfig::default().with_risk_free_rate(f64::NAN);
    assert!(matches!(config.validate(), Err(Error::InvalidRate { name: "risk_free_rate", .. })));
}

#[cfg(all(test, feature = "serde"))]
#[test]
fn parse_partial_toml() {
    let config = BacktestConfig::from_toml_str(
        r#"
        initial_capital = 25000.0
        instrument = "ETH-USD"
        trade_stats = "round_trips"
        "#,
    )
    .unwrap();

    assert_eq!(config.initial_capital, 25_000.0);
    assert_eq!(config.instrument, "ETH-USD");
    assert_eq!(config.trade_stats, TradeStatsMode::RoundTrips);
    assert_eq!(config.commission, 0.001);
}

#[cfg(all(test, feature = "serde"))]
#[test]
fn parse_invalid_toml() {
    assert!(matches!(BacktestConfig::from_toml_str("commission = \"high\""), Err(Error::ConfigError(_))));
    assert!(matches!(
        BacktestConfig::from_toml_str("initial_capital = -5.0"),
        Err(Error::NegZeroCapital(_))
    ));
}
