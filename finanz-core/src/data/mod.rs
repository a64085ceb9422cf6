//! Price series providers and the bar cache.

pub mod cache;
pub mod csv_import;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use cache::{BarCache, CacheKey, CacheStats, CachedProvider};
pub use csv_import::CsvProvider;
pub use provider::{finish_fetch, normalize_bars, DataError, DataProvider, DataSource, FetchResult};
pub use synthetic::SyntheticProvider;
pub use yahoo::YahooProvider;
