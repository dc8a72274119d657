mod aggregator;
mod builder;
mod http_source;
mod jsonl_store;
mod models;
mod retry;
mod source;
mod store;

pub use aggregator::{merge_rates, RateAggregator};
pub use builder::{build_aggregator, build_store};
pub use http_source::{FetchError, HttpRateSource};
pub use jsonl_store::JsonlRateStore;
pub use models::{InstrumentClass, Rate, RatesSnapshot, StoredRate};
pub use retry::RetryPolicy;
pub use source::{NoopSource, RateSource};
pub use store::{latest_per_symbol, MemoryRateStore, RateStore};
