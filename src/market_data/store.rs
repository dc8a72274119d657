use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::{InstrumentClass, Rate, StoredRate};

/// Append-only record of every observed rate, with "latest per symbol" reads.
#[async_trait::async_trait]
pub trait RateStore: Send + Sync {
    /// Persist one row per rate, all stamped with `observed_at`. Empty input is a no-op.
    async fn append(
        &self,
        class: InstrumentClass,
        rates: &[Rate],
        observed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// The most recent row for every symbol ever written, ordered by symbol.
    async fn read_latest(&self, class: InstrumentClass) -> Result<Vec<StoredRate>>;
}

/// Reduce rows given in insertion order to the newest row per symbol.
///
/// Rows sharing a timestamp resolve to the one inserted last.
pub fn latest_per_symbol<I>(rows: I) -> Vec<StoredRate>
where
    I: IntoIterator<Item = StoredRate>,
{
    let mut latest: BTreeMap<String, StoredRate> = BTreeMap::new();
    for row in rows {
        match latest.get(&row.symbol) {
            Some(existing) if existing.observed_at > row.observed_at => {}
            _ => {
                latest.insert(row.symbol.clone(), row);
            }
        }
    }
    latest.into_values().collect()
}

#[derive(Default)]
pub struct MemoryRateStore {
    rows: tokio::sync::Mutex<HashMap<InstrumentClass, Vec<StoredRate>>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row appended for `class`, oldest first.
    pub async fn rows(&self, class: InstrumentClass) -> Vec<StoredRate> {
        let rows = self.rows.lock().await;
        rows.get(&class).cloned().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl RateStore for MemoryRateStore {
    async fn append(
        &self,
        class: InstrumentClass,
        rates: &[Rate],
        observed_at: DateTime<Utc>,
    ) -> Result<()> {
        if rates.is_empty() {
            return Ok(());
        }
        let mut rows = self.rows.lock().await;
        rows.entry(class).or_default().extend(
            rates
                .iter()
                .map(|rate| StoredRate::from_rate(rate, observed_at)),
        );
        Ok(())
    }

    async fn read_latest(&self, class: InstrumentClass) -> Result<Vec<StoredRate>> {
        let rows = self.rows.lock().await;
        Ok(latest_per_symbol(
            rows.get(&class).into_iter().flatten().cloned(),
        ))
    }
}
