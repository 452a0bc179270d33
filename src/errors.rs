use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The bar series provided is empty. A replay requires at least one bar.
    #[error("Bar series is empty: a replay requires at least one bar")]
    BarSeriesEmpty,

    /// Bar timestamps must be strictly increasing.
    #[error("Bar {index} is not after the previous bar ({previous} >= {current})")]
    NonMonotonicTimestamp {
        /// Index of the offending bar.
        index: usize,
        /// Timestamp of the bar before it.
        previous: DateTime<Utc>,
        /// Timestamp of the offending bar.
        current: DateTime<Utc>,
    },

    /// A bar price is NaN or infinite.
    #[error("Bar price `{field}` is not finite (got: {value})")]
    NonFinitePrice {
        /// Name of the OHLC field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The bar builder was finalized without a required field.
    #[error("Bar is missing the `{0}` field")]
    MissingBarField(&'static str),

    /// A bar lacks an indicator column the strategy depends on.
    #[error("Bar {index} has no `{name}` indicator column")]
    MissingIndicator {
        /// Index of the bar.
        index: usize,
        /// Name of the missing column.
        name: String,
    },

    /// The initial capital is not positive.
    #[error("Initial capital must be positive (got: {0})")]
    NegZeroCapital(f64),

    /// A rate (commission, slippage, risk-free) is negative or not finite.
    #[error("Rate `{name}` must be finite and non-negative (got: {value})")]
    InvalidRate {
        /// Name of the rate.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The order size is not a positive finite number.
    #[error("Order size must be positive (got: {0})")]
    NegZeroSize(f64),

    /// A limit order needs a positive finite limit price.
    #[error("Limit price must be positive (got: {0})")]
    InvalidLimitPrice(f64),

    /// A strategy returned an order for an instrument other than the replayed one.
    #[error("Order targets `{got}` but the replay trades `{expected}`")]
    ForeignInstrument {
        /// The replayed instrument.
        expected: String,
        /// The instrument named by the order.
        got: String,
    },

    /// The strategy aborted the replay.
    #[error("Strategy error: {0}")]
    Strategy(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The configuration document could not be parsed.
    #[cfg(feature = "serde")]
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
}
