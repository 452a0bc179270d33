use std::{ops::Deref, sync::Arc};

use crate::{
    engine::Bar,
    errors::{Error, Result},
};

/// A validated, immutable, chronologically ordered sequence of bars.
///
/// Cloning is cheap: the bars live behind an `Arc` so independent replays
/// can share one series.
#[derive(Debug, Clone)]
pub struct BarSeries {
    bars: Arc<[Bar]>,
}

impl BarSeries {
    /// Validates and wraps a list of bars.
    ///
    /// Fails if the list is empty, if any price is not finite, or if the
    /// timestamps are not strictly increasing.
    pub fn new(bars: impl Into<Arc<[Bar]>>) -> Result<Self> {
        let bars = bars.into();
        if bars.is_empty() {
            return Err(Error::BarSeriesEmpty);
        }

        for bar in bars.iter() {
            bar.check_prices()?;
        }

        for (index, pair) in bars.windows(2).enumerate() {
            let (previous, current) = (pair[0].timestamp(), pair[1].timestamp());
            if current <= previous {
                return Err(Error::NonMonotonicTimestamp {
                    index: index + 1,
                    previous,
                    current,
                });
            }
        }

        Ok(Self { bars })
    }

    /// Checks that every bar carries each of the given indicator columns.
    pub fn require_indicators(&self, names: &[&str]) -> Result<()> {
        for (index, bar) in self.bars.iter().enumerate() {
            if let Some(name) = names.iter().find(|name| bar.indicator(name).is_none()) {
                return Err(Error::MissingIndicator {
                    index,
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Deref for BarSeries {
    type Target = [Bar];

    fn deref(&self) -> &Self::Target {
        &self.bars
    }
}

impl TryFrom<Vec<Bar>> for BarSeries {
    type Error = Error;

    fn try_from(value: Vec<Bar>) -> Result<Self> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration};

    use super::*;
    use crate::engine::BarBuilder;

    fn bar(secs: i64, close: f64) -> Bar {
        BarBuilder::builder()
            .timestamp(DateTime::from_timestamp_secs(1515151515).unwrap() + Duration::seconds(secs))
            .open(close)
            .high(close)
            .low(close)
            .close(close)
            .build()
            .unwrap()
    }

    #[test]
    fn accepts_sorted_bars() {
        let series = BarSeries::new(vec![bar(0, 1.0), bar(60, 2.0), bar(120, 3.0)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[2].close(), 3.0);
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(BarSeries::new(Vec::new()), Err(Error::BarSeriesEmpty)));
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let result = BarSeries::new(vec![bar(0, 1.0), bar(60, 2.0), bar(60, 3.0)]);
        assert!(matches!(result, Err(Error::NonMonotonicTimestamp { index: 2, .. })));
    }

    #[test]
    fn rejects_descending_timestamp() {
        let result = BarSeries::new(vec![bar(60, 1.0), bar(0, 2.0)]);
        assert!(matches!(result, Err(Error::NonMonotonicTimestamp { index: 1, .. })));
    }

    #[test]
    fn missing_indicator_is_reported() {
        let mut with_sma = bar(0, 1.0);
        with_sma.set_indicator("sma", 1.0);
        let series = BarSeries::new(vec![with_sma, bar(60, 2.0)]).unwrap();

        assert!(series.require_indicators(&[]).is_ok());
        let result = series.require_indicators(&["sma"]);
        assert!(matches!(result, Err(Error::MissingIndicator { index: 1, ref name }) if name == "sma"));
    }
}
