use super::{InstrumentClass, Rate};

/// Live rates for one instrument class.
///
/// Implementations absorb every failure: an unreachable or misbehaving provider
/// yields an empty list.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self, class: InstrumentClass) -> Vec<Rate>;

    fn name(&self) -> &str;
}

/// A source that never has live data; every cycle falls back to stored rates.
pub struct NoopSource;

#[async_trait::async_trait]
impl RateSource for NoopSource {
    async fn fetch_rates(&self, _class: InstrumentClass) -> Vec<Rate> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "noop"
    }
}
