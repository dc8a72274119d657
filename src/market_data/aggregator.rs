use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};

use super::{InstrumentClass, Rate, RateSource, RateStore, RatesSnapshot};

/// Combines live provider rates with the last persisted rates for both instrument classes.
///
/// [`RateAggregator::current_rates`] never fails. Source failures arrive as an empty live
/// list; store failures are logged here and replaced with "nothing written" or "nothing
/// stored".
pub struct RateAggregator {
    source: Arc<dyn RateSource>,
    store: Arc<dyn RateStore>,
    clock: Arc<dyn Clock>,
}

impl RateAggregator {
    pub fn new(source: Arc<dyn RateSource>, store: Arc<dyn RateStore>) -> Self {
        Self {
            source,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run one aggregation cycle. Fiat and crypto are processed concurrently; every row
    /// written during the cycle carries the same timestamp.
    pub async fn current_rates(&self) -> RatesSnapshot {
        let observed_at = self.clock.now();
        let (fiat, crypto) = tokio::join!(
            self.class_rates(InstrumentClass::Fiat, observed_at),
            self.class_rates(InstrumentClass::Crypto, observed_at),
        );
        RatesSnapshot { fiat, crypto }
    }

    async fn class_rates(&self, class: InstrumentClass, observed_at: DateTime<Utc>) -> Vec<Rate> {
        let live = self.source.fetch_rates(class).await;

        if live.is_empty() {
            let stored = self.latest_snapshot(class).await;
            info!(
                class = %class,
                source = self.source.name(),
                stored = stored.len(),
                "no live rates; serving latest stored snapshot"
            );
            return merge_rates(&[], stored);
        }

        if let Err(e) = self.store.append(class, &live, observed_at).await {
            warn!(class = %class, error = %e, "failed to persist live rates");
        }

        let stored = self.latest_snapshot(class).await;
        let stored_count = stored.len();
        let merged = merge_rates(&live, stored);
        info!(
            class = %class,
            live = live.len(),
            stored = stored_count,
            merged = merged.len(),
            "merged live rates with stored snapshot"
        );
        merged
    }

    async fn latest_snapshot(&self, class: InstrumentClass) -> Vec<Rate> {
        match self.store.read_latest(class).await {
            Ok(rows) => rows.into_iter().map(Rate::from).collect(),
            Err(e) => {
                warn!(class = %class, error = %e, "failed to read latest stored rates");
                Vec::new()
            }
        }
    }
}

/// Key stored rates by symbol, then overwrite with live rates. Output is sorted by symbol
/// with one entry per symbol; a symbol repeated in `live` keeps its last value.
pub fn merge_rates(live: &[Rate], stored: Vec<Rate>) -> Vec<Rate> {
    let mut by_symbol: BTreeMap<String, Rate> = stored
        .into_iter()
        .map(|rate| (rate.symbol.clone(), rate))
        .collect();
    for rate in live {
        by_symbol.insert(rate.symbol.clone(), rate.clone());
    }
    by_symbol.into_values().collect()
}
