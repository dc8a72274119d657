#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use currency_rates::market_data::{
    InstrumentClass, MemoryRateStore, Rate, RateSource, RateStore, StoredRate,
};

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
}

pub fn rates(pairs: &[(&str, f64)]) -> Vec<Rate> {
    pairs
        .iter()
        .map(|(symbol, value)| Rate::new(*symbol, *value))
        .collect()
}

/// Replays queued responses per class, then answers with the fallback (empty by default).
#[derive(Default)]
pub struct ScriptedSource {
    queued: Mutex<HashMap<InstrumentClass, VecDeque<Vec<Rate>>>>,
    fallback: HashMap<InstrumentClass, Vec<Rate>>,
    calls: Mutex<Vec<InstrumentClass>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call for `class` with `rates` once the queue is drained.
    pub fn always(mut self, class: InstrumentClass, rates: Vec<Rate>) -> Self {
        self.fallback.insert(class, rates);
        self
    }

    /// Queue one response for the next call for `class`.
    pub fn then(self, class: InstrumentClass, rates: Vec<Rate>) -> Self {
        self.queued
            .lock()
            .unwrap()
            .entry(class)
            .or_default()
            .push_back(rates);
        self
    }

    pub fn calls(&self, class: InstrumentClass) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == class)
            .count()
    }
}

#[async_trait]
impl RateSource for ScriptedSource {
    async fn fetch_rates(&self, class: InstrumentClass) -> Vec<Rate> {
        self.calls.lock().unwrap().push(class);
        let next = self
            .queued
            .lock()
            .unwrap()
            .get_mut(&class)
            .and_then(|queue| queue.pop_front());
        next.unwrap_or_else(|| self.fallback.get(&class).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Wraps a [`MemoryRateStore`] and fails appends and/or reads on demand.
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryRateStore,
    fail_append: bool,
    fail_read: bool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_appends(mut self) -> Self {
        self.fail_append = true;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_read = true;
        self
    }
}

#[async_trait]
impl RateStore for FailingStore {
    async fn append(
        &self,
        class: InstrumentClass,
        rates: &[Rate],
        observed_at: DateTime<Utc>,
    ) -> Result<()> {
        if self.fail_append {
            anyhow::bail!("simulated append failure for {class}");
        }
        self.inner.append(class, rates, observed_at).await
    }

    async fn read_latest(&self, class: InstrumentClass) -> Result<Vec<StoredRate>> {
        if self.fail_read {
            anyhow::bail!("simulated read failure for {class}");
        }
        self.inner.read_latest(class).await
    }
}
