use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::errors::{Error, Result};

/// One OHLCV observation, optionally annotated with indicator columns.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    volume: f64,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "BTreeMap::is_empty"))]
    indicators: BTreeMap<String, f64>,
}

impl Bar {
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Returns the value of an indicator column, if the bar carries it.
    pub fn indicator(&self, name: &str) -> Option<f64> {
        self.indicators.get(name).copied()
    }

    /// Returns an iterator over the indicator columns.
    pub fn indicators(&self) -> impl Iterator<Item = (&str, f64)> {
        self.indicators.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Attaches (or replaces) an indicator column.
    pub fn set_indicator(&mut self, name: impl Into<String>, value: f64) {
        self.indicators.insert(name.into(), value);
    }

    pub(crate) fn check_prices(&self) -> Result<()> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() {
                return Err(Error::NonFinitePrice { field, value });
            }
        }
        Ok(())
    }
}

/// Builder for [`Bar`].
///
/// Timestamp and the four prices are required, volume defaults to zero.
/// The OHLC relationship (`low <= open, close <= high`) is not checked.
#[derive(Debug, Default)]
pub struct BarBuilder {
    timestamp: Option<DateTime<Utc>>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: f64,
    indicators: BTreeMap<String, f64>,
}

impl BarBuilder {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn indicator(mut self, name: impl Into<String>, value: f64) -> Self {
        self.indicators.insert(name.into(), value);
        self
    }

    pub fn build(self) -> Result<Bar> {
        let bar = Bar {
            timestamp: self.timestamp.ok_or(Error::MissingBarField("timestamp"))?,
            open: self.open.ok_or(Error::MissingBarField("open"))?,
            high: self.high.ok_or(Error::MissingBarField("high"))?,
            low: self.low.ok_or(Error::MissingBarField("low"))?,
            close: self.close.ok_or(Error::MissingBarField("close"))?,
            volume: self.volume,
            indicators: self.indicators,
        };
        bar.check_prices()?;
        Ok(bar)
    }
}

#[cfg(test)]
#[test]
fn build_bar() {
    let bar = BarBuilder::builder()
        .timestamp(DateTime::from_timestamp_secs(1515151515).unwrap())
        .open(100.0)
        .high(110.0)
        .low(95.0)
        .close(105.0)
        .volume(12.0)
        .indicator("sma_20", 101.5)
        .build()
        .unwrap();

    assert_eq!(bar.open(), 100.0);
    assert_eq!(bar.high(), 110.0);
    assert_eq!(bar.low(), 95.0);
    assert_eq!(bar.close(), 105.0);
    assert_eq!(bar.volume(), 12.0);
    assert_eq!(bar.indicator("sma_20"), Some(101.5));
    assert_eq!(bar.indicator("rsi"), None);
}

#[cfg(test)]
#[test]
fn build_bar_missing_field() {
    let result = BarBuilder::builder()
        .timestamp(DateTime::default())
        .open(100.0)
        .high(110.0)
        .close(105.0)
        .build();
    assert!(matches!(result, Err(Error::MissingBarField("low"))));
}

#[cfg(test)]
#[test]
fn build_bar_non_finite_price() {
    let result = BarBuilder::builder()
        .timestamp(DateTime::default())
        .open(f64::NAN)
        .high(110.0)
        .low(90.0)
        .close(105.0)
        .build();
    assert!(matches!(result, Err(Error::NonFinitePrice { field: "open", .. })));
}

#[cfg(test)]
#[test]
fn volume_defaults_to_zero() {
    let bar = BarBuilder::builder()
        .timestamp(DateTime::default())
        .open(1.0)
        .high(1.0)
        .low(1.0)
        .close(1.0)
        .build()
        .unwrap();
    assert_eq!(bar.volume(), 0.0);
    assert_eq!(bar.indicators().count(), 0);
}
