use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The two independent rate domains. Symbols never cross between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    Fiat,
    Crypto,
}

impl InstrumentClass {
    pub const ALL: [InstrumentClass; 2] = [InstrumentClass::Fiat, InstrumentClass::Crypto];

    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentClass::Fiat => "fiat",
            InstrumentClass::Crypto => "crypto",
        }
    }
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instrument's value, as served to callers and as received from the provider.
///
/// The provider may name the fields `currency`/`name` and `rate`/`value`;
/// responses always use `currency` and `rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    #[serde(rename = "currency", alias = "name")]
    pub symbol: String,
    #[serde(rename = "rate", alias = "value")]
    pub value: f64,
}

impl Rate {
    pub fn new(symbol: impl Into<String>, value: f64) -> Self {
        Self {
            symbol: symbol.into(),
            value,
        }
    }
}

/// A persisted observation. Every row written in one aggregation cycle carries the same
/// `observed_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRate {
    pub symbol: String,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

impl StoredRate {
    pub fn from_rate(rate: &Rate, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol: rate.symbol.clone(),
            value: rate.value,
            observed_at,
        }
    }
}

impl From<StoredRate> for Rate {
    fn from(stored: StoredRate) -> Self {
        Rate {
            symbol: stored.symbol,
            value: stored.value,
        }
    }
}

/// Result of one aggregation cycle: per class, unique symbols in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatesSnapshot {
    pub fiat: Vec<Rate>,
    pub crypto: Vec<Rate>,
}
