use std::sync::Arc;

use anyhow::Result;

use crate::config::{ResolvedConfig, StorageBackend};
use crate::market_data::{HttpRateSource, JsonlRateStore, MemoryRateStore, RateAggregator, RateStore};

/// Store selected by `storage.backend`. The JSONL store lives under the resolved data directory.
pub fn build_store(config: &ResolvedConfig) -> Arc<dyn RateStore> {
    match config.storage.backend {
        StorageBackend::Jsonl => Arc::new(JsonlRateStore::new(&config.data_dir)),
        StorageBackend::Memory => Arc::new(MemoryRateStore::new()),
    }
}

/// Validate the configuration and wire the HTTP source and configured store into an aggregator.
pub fn build_aggregator(config: &ResolvedConfig) -> Result<RateAggregator> {
    config.validate()?;

    let source = HttpRateSource::new(&config.upstream, &config.http);
    tracing::debug!(
        base_url = %config.upstream.base_url,
        backend = ?config.storage.backend,
        data_dir = %config.data_dir.display(),
        "building rate aggregator"
    );

    Ok(RateAggregator::new(Arc::new(source), build_store(config)))
}
