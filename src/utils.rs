use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    engine::{Bar, BarBuilder},
    errors::Result,
};

/// Parameters of a synthetic daily random walk.
///
/// Log returns are drawn from `N(trend, volatility)`; each open deviates
/// from the previous close by `N(0, volatility / 3)`, and the wicks extend
/// past the body by a random share of the day's range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomWalk {
    pub start_price: f64,
    pub volatility: f64,
    pub trend: f64,
    pub start: DateTime<Utc>,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self {
            start_price: 50_000.0,
            volatility: 0.02,
            trend: 0.0001,
            // 2023-01-01T00:00:00Z
            start: DateTime::from_timestamp_secs(1672531200).unwrap_or_default(),
        }
    }
}

impl RandomWalk {
    /// Generates `periods` daily bars. The same seed always yields the same bars.
    pub fn generate(&self, periods: usize, seed: u64) -> Result<Vec<Bar>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut bars = Vec::with_capacity(periods);
        let mut close = self.start_price;

        for i in 0..periods {
            let open = if i == 0 {
                self.start_price
            } else {
                close * (1.0 + normal(&mut rng, 0.0, self.volatility / 3.0))
            };
            close *= normal(&mut rng, self.trend, self.volatility).exp();

            let range = close * self.volatility * rng.random_range(0.5..2.0);
            let high = open.max(close) + range * rng.random_range(0.0..0.5);
            let low = open.min(close) - range * rng.random_range(0.0..0.5);
            let volume = normal(&mut rng, 20.0, 1.0).exp();

            bars.push(
                BarBuilder::builder()
                    .timestamp(self.start + Duration::days(i as i64))
                    .open(open)
                    .high(high)
                    .low(low)
                    .close(close)
                    .volume(volume)
                    .build()?,
            );
        }

        Ok(bars)
    }
}

/// Generates `periods` daily bars with the default [`RandomWalk`].
pub fn generate_bars(periods: usize, seed: u64) -> Result<Vec<Bar>> {
    RandomWalk::default().generate(periods, seed)
}

// Box-Muller
fn normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(feature = "serde")]
/// Reads a JSON array of bars from `filepath`.
pub fn bars_from_json_file(filepath: impl AsRef<std::path::Path>) -> Result<Vec<Bar>> {
    use crate::errors::Error;
    use std::{fs::File, io::BufReader};

    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(Error::from)
}

/// Generates a random ID.
pub(crate) fn random_id() -> u32 {
    rand::random()
}

#[cfg(test)]
#[test]
fn same_seed_same_bars() {
    let a = generate_bars(50, 7).unwrap();
    let b = generate_bars(50, 7).unwrap();
    let c = generate_bars(50, 8).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[cfg(test)]
#[test]
fn generated_bars_are_consistent() {
    let bars = generate_bars(200, 42).unwrap();
    assert_eq!(bars.len(), 200);
    assert_eq!(bars[0].open(), 50_000.0);
    for bar in &bars {
        assert!(bar.high() >= bar.open().max(bar.close()));
        assert!(bar.low() <= bar.open().min(bar.close()));
        assert!(bar.volume() > 0.0);
    }
    assert!(crate::engine::BarSeries::new(bars).is_ok());
}

#[cfg(all(test, feature = "serde"))]
#[test]
fn read_bars_from_json() {
    let path = std::env::temp_dir().join(format!("bar-replay-{}.json", random_id()));
    std::fs::write(
        &path,
        r#"[
            {"timestamp": "2023-01-01T00:00:00Z", "open": 100.0, "high": 110.0, "low": 95.0, "close": 105.0, "volume": 3.0},
            {"timestamp": "2023-01-02T00:00:00Z", "open": 105.0, "high": 108.0, "low": 101.0, "close": 102.0,
             "indicators": {"sma_2": 103.5}}
        ]"#,
    )
    .unwrap();

    let bars = bars_from_json_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].close(), 105.0);
    assert_eq!(bars[1].volume(), 0.0);
    assert_eq!(bars[1].indicator("sma_2"), Some(103.5));
}

#[cfg(all(test, feature = "serde"))]
#[test]
fn read_missing_file() {
    let result = bars_from_json_file("/definitely/not/here.json");
    assert!(matches!(result, Err(crate::errors::Error::IoError(_))));
}
