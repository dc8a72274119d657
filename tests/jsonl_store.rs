mod support;

use std::sync::Arc;

use anyhow::Result;
use currency_rates::market_data::{InstrumentClass, JsonlRateStore, RateStore, StoredRate};
use support::{at, rates};
use tempfile::TempDir;

fn read_rows(store: &JsonlRateStore, class: InstrumentClass) -> Result<Vec<StoredRate>> {
    let contents = std::fs::read_to_string(store.class_file(class))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<StoredRate>(line).map_err(anyhow::Error::from))
        .collect()
}

#[tokio::test]
async fn missing_directory_reads_empty() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonlRateStore::new(dir.path().join("not-created-yet"));

    assert!(store.read_latest(InstrumentClass::Fiat).await?.is_empty());
    assert!(store.read_latest(InstrumentClass::Crypto).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn same_timestamp_prefers_later_batch() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonlRateStore::new(dir.path());

    store
        .append(InstrumentClass::Crypto, &rates(&[("BTC", 65000.0)]), at(9, 0))
        .await?;
    store
        .append(InstrumentClass::Crypto, &rates(&[("BTC", 65100.0)]), at(9, 0))
        .await?;

    let latest = store.read_latest(InstrumentClass::Crypto).await?;
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].value, 65100.0);

    Ok(())
}

#[tokio::test]
async fn older_timestamp_written_later_does_not_win() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JsonlRateStore::new(dir.path());

    store
        .append(InstrumentClass::Fiat, &rates(&[("USD", 41.0)]), at(10, 0))
        .await?;
    store
        .append(InstrumentClass::Fiat, &rates(&[("USD", 39.0)]), at(9, 0))
        .await?;

    let latest = store.read_latest(InstrumentClass::Fiat).await?;
    assert_eq!(latest[0].value, 41.0);
    assert_eq!(read_rows(&store, InstrumentClass::Fiat)?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn concurrent_appends_keep_batches_whole() -> Result<()> {
    let dir = TempDir::new()?;
    let store = Arc::new(JsonlRateStore::new(dir.path()));

    let mut handles = Vec::new();
    for batch in 0..8u32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let batch_rates = rates(&[("AAA", batch as f64), ("BBB", batch as f64)]);
            store
                .append(InstrumentClass::Fiat, &batch_rates, at(11, batch))
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let rows = read_rows(&store, InstrumentClass::Fiat)?;
    assert_eq!(rows.len(), 16);
    for pair in rows.chunks(2) {
        assert_eq!(pair[0].symbol, "AAA");
        assert_eq!(pair[1].symbol, "BBB");
        assert_eq!(pair[0].observed_at, pair[1].observed_at);
    }

    let latest = store.read_latest(InstrumentClass::Fiat).await?;
    assert_eq!(latest.len(), 2);
    assert!(latest.iter().all(|row| row.value == 7.0));

    Ok(())
}
