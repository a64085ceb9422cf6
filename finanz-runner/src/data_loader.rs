//! Bar loading and data resolution for the runner.
//!
//! Implements the fallback policy:
//! 1. Fetch from the configured provider
//! 2. If that fails and `synthetic` is set → generate synthetic bars (tagged)
//! 3. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only mode. Results produced on synthetic
//! data carry `has_synthetic = true` and must never be read as market results.

use chrono::NaiveDate;
use finanz_core::data::synthetic::generate_bars;
use finanz_core::data::{DataError, DataProvider, DataSource};
use finanz_core::domain::Bar;
use finanz_core::BacktestError;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("fetching '{symbol}' failed: {source}")]
    FetchFailed {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("no bars for '{symbol}' between {start} and {end}")]
    NoBars {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl LoadError {
    pub fn symbol(&self) -> &str {
        match self {
            LoadError::FetchFailed { symbol, .. }
            | LoadError::NoBars { symbol, .. } => symbol,
        }
    }
}

impl From<LoadError> for BacktestError {
    fn from(err: LoadError) -> Self {
        BacktestError::DataUnavailable {
            symbol: err.symbol().to_string(),
            reason: match &err {
                LoadError::FetchFailed { source, .. } => source.to_string(),
                other => other.to_string(),
            },
        }
    }
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Start date for bars (inclusive).
    pub start: NaiveDate,
    /// End date for bars (inclusive).
    pub end: NaiveDate,
    /// If true, generate synthetic bars when real data is unavailable.
    pub synthetic: bool,
}

/// Result of loading bars, including data source provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over all bar data, for reproducibility checks.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

impl LoadedData {
    /// Wrap bars that were obtained elsewhere.
    pub fn from_bars(symbol: &str, bars: Vec<Bar>, source: DataSource) -> Self {
        let dataset_hash = compute_dataset_hash(symbol, &bars);
        Self {
            symbol: symbol.to_string(),
            has_synthetic: source == DataSource::Synthetic,
            bars,
            source,
            dataset_hash,
        }
    }
}

/// Load bars for one symbol, with optional synthetic fallback.
pub fn load_bars(
    symbol: &str,
    provider: &dyn DataProvider,
    opts: &LoadOptions,
) -> Result<LoadedData, LoadError> {
    let failure = match provider.fetch(symbol, opts.start, opts.end) {
        Ok(result) if !result.bars.is_empty() => {
            debug!(
                symbol,
                bars = result.bars.len(),
                source = %result.source,
                "loaded bars"
            );
            return Ok(LoadedData::from_bars(symbol, result.bars, result.source));
        }
        Ok(_) => LoadError::NoBars {
            symbol: symbol.to_string(),
            start: opts.start,
            end: opts.end,
        },
        Err(source) => LoadError::FetchFailed {
            symbol: symbol.to_string(),
            source,
        },
    };

    if !opts.synthetic {
        return Err(failure);
    }

    warn!(
        symbol,
        reason = %failure,
        "generating synthetic data; results will be tagged as synthetic"
    );
    let bars = generate_bars(symbol, opts.start, opts.end);
    if bars.is_empty() {
        return Err(LoadError::NoBars {
            symbol: symbol.to_string(),
            start: opts.start,
            end: opts.end,
        });
    }
    Ok(LoadedData::from_bars(symbol, bars, DataSource::Synthetic))
}

/// Compute a deterministic BLAKE3 hash over a symbol's bar data.
pub fn compute_dataset_hash(symbol: &str, bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
