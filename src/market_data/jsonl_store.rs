use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use super::{latest_per_symbol, InstrumentClass, Rate, RateStore, StoredRate};

/// Durable rate history: one append-only JSON-lines file per instrument class.
///
/// Layout: `<base_path>/rates/fiat.jsonl` and `<base_path>/rates/crypto.jsonl`.
pub struct JsonlRateStore {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlRateStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn class_file(&self, class: InstrumentClass) -> PathBuf {
        self.base_path
            .join("rates")
            .join(format!("{}.jsonl", class.as_str()))
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_jsonl(&self, path: &Path) -> Result<Vec<StoredRate>> {
        let file = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to open file"),
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: StoredRate = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSONL line: {line}"))?;
            items.push(item);
        }

        Ok(items)
    }

    async fn append_jsonl(&self, path: &Path, items: &[StoredRate]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        // Build the full batch before touching the file.
        let mut content = String::new();
        for item in items {
            let line = serde_json::to_string(item).context("Failed to serialize item")?;
            content.push_str(&line);
            content.push('\n');
        }

        self.ensure_dir(path).await?;

        let _guard = self.write_lock.lock().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open file for append")?;

        file.write_all(content.as_bytes())
            .await
            .context("Failed to append rates")?;
        file.flush().await.context("Failed to flush rates")?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl RateStore for JsonlRateStore {
    async fn append(
        &self,
        class: InstrumentClass,
        rates: &[Rate],
        observed_at: DateTime<Utc>,
    ) -> Result<()> {
        let rows: Vec<StoredRate> = rates
            .iter()
            .map(|rate| StoredRate::from_rate(rate, observed_at))
            .collect();
        self.append_jsonl(&self.class_file(class), &rows).await
    }

    async fn read_latest(&self, class: InstrumentClass) -> Result<Vec<StoredRate>> {
        let rows = self.read_jsonl(&self.class_file(class)).await?;
        Ok(latest_per_symbol(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn append_only_grows_the_class_file() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonlRateStore::new(dir.path());

        store
            .append(
                InstrumentClass::Fiat,
                &[Rate::new("USD", 40.0), Rate::new("EUR", 43.0)],
                at(0),
            )
            .await?;
        store
            .append(InstrumentClass::Fiat, &[Rate::new("USD", 41.0)], at(5))
            .await?;

        let contents = fs::read_to_string(store.class_file(InstrumentClass::Fiat)).await?;
        let parsed: Vec<StoredRate> = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].symbol, "USD");
        assert_eq!(parsed[0].value, 40.0);
        assert_eq!(parsed[2].observed_at, at(5));

        let latest = store.read_latest(InstrumentClass::Fiat).await?;
        let summary: Vec<(&str, f64)> = latest
            .iter()
            .map(|r| (r.symbol.as_str(), r.value))
            .collect();
        assert_eq!(summary, vec![("EUR", 43.0), ("USD", 41.0)]);

        assert!(!store.class_file(InstrumentClass::Crypto).exists());

        Ok(())
    }

    #[tokio::test]
    async fn empty_append_does_not_create_file() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonlRateStore::new(dir.path());

        store.append(InstrumentClass::Crypto, &[], at(0)).await?;
        assert!(!store.class_file(InstrumentClass::Crypto).exists());
        assert!(store.read_latest(InstrumentClass::Crypto).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn corrupt_line_fails_the_read() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonlRateStore::new(dir.path());
        let path = store.class_file(InstrumentClass::Fiat);
        fs::create_dir_all(path.parent().unwrap()).await?;
        fs::write(&path, "{\"symbol\":\"USD\"\n").await?;

        assert!(store.read_latest(InstrumentClass::Fiat).await.is_err());

        Ok(())
    }
}
