//! Upstream rate provider over HTTP.
//!
//! Each instrument class has its own endpoint under a shared base URL. The provider
//! answers with a JSON array of `{currency|name, rate|value}` objects and expects a
//! static API key header on every request.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use super::{InstrumentClass, Rate, RateSource, RetryPolicy};
use crate::config::{HttpConfig, UpstreamConfig};

/// Why a single attempt against the provider failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned {status}")]
    Status { status: StatusCode, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("payload contains an entry with an empty symbol")]
    EmptySymbol,
}

/// Fetches live rates from the configured provider with timeout and retry.
pub struct HttpRateSource {
    client: Client,
    base_url: String,
    fiat_path: String,
    crypto_path: String,
    api_key_header: String,
    api_key: SecretString,
    retry: RetryPolicy,
}

impl HttpRateSource {
    pub fn new(upstream: &UpstreamConfig, http: &HttpConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: upstream.base_url.clone(),
            fiat_path: upstream.fiat_path.clone(),
            crypto_path: upstream.crypto_path.clone(),
            api_key_header: upstream.api_key_header.clone(),
            api_key: upstream.api_key.clone(),
            retry: RetryPolicy::from_http_config(http),
        }
    }

    /// Point the source at a different host, keeping the configured paths.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn url(&self, class: InstrumentClass) -> String {
        let path = match class {
            InstrumentClass::Fiat => &self.fiat_path,
            InstrumentClass::Crypto => &self.crypto_path,
        };
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// One timeout-bounded request. Any decoding problem discards the whole response.
    async fn fetch_once(&self, class: InstrumentClass) -> Result<Vec<Rate>, FetchError> {
        let request = self
            .client
            .get(self.url(class))
            .header(self.api_key_header.as_str(), self.api_key.expose_secret())
            .header(ACCEPT, "application/json");

        let attempt = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(FetchError::Status { status, body });
            }
            let bytes = response.bytes().await?;
            let rates: Vec<Rate> = serde_json::from_slice(&bytes)?;
            Ok::<_, FetchError>(rates)
        };

        let rates = tokio::time::timeout(self.retry.timeout, attempt)
            .await
            .map_err(|_| FetchError::Timeout(self.retry.timeout))??;

        if rates.iter().any(|rate| rate.symbol.is_empty()) {
            return Err(FetchError::EmptySymbol);
        }

        Ok(rates)
    }

    /// Runs up to [`RetryPolicy::total_attempts`] attempts and returns the last error if
    /// none succeeds.
    pub async fn fetch_with_retry(&self, class: InstrumentClass) -> Result<Vec<Rate>, FetchError> {
        let total = self.retry.total_attempts();
        let mut attempt = 1;
        loop {
            match self.fetch_once(class).await {
                Ok(rates) => return Ok(rates),
                Err(e) => {
                    log_failed_attempt(class, attempt, total, &e);
                    if attempt >= total {
                        return Err(e);
                    }
                    tokio::time::sleep(self.retry.delay_for_retry(attempt - 1)).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn log_failed_attempt(class: InstrumentClass, attempt: u32, total: u32, error: &FetchError) {
    match error {
        FetchError::Status { status, body } => warn!(
            class = %class,
            attempt,
            total,
            status = %status,
            body = %body,
            "rate fetch failed"
        ),
        other => warn!(
            class = %class,
            attempt,
            total,
            error = %other,
            "rate fetch failed"
        ),
    }
}

#[async_trait::async_trait]
impl RateSource for HttpRateSource {
    async fn fetch_rates(&self, class: InstrumentClass) -> Vec<Rate> {
        match self.fetch_with_retry(class).await {
            Ok(rates) => {
                debug!(class = %class, count = rates.len(), "fetched live rates");
                rates
            }
            Err(e) => {
                warn!(class = %class, error = %e, "no live rates; continuing with none");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
