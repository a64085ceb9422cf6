//! TOML backtest configuration.
//!
//! ```toml
//! [backtest]
//! initial_capital = 100000.0
//!
//! [crossover]
//! short_window = 50
//! long_window = 200
//!
//! [data]
//! provider = "yahoo"        # yahoo | csv | synthetic
//! csv_dir = "data"
//! synthetic_fallback = false
//! cache_capacity = 64
//! signals_file = "signals.csv"
//! ```
//!
//! Every section and key is optional. `FINANZ_INITIAL_CAPITAL` in the
//! environment overrides `backtest.initial_capital`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use finanz_core::data::{CachedProvider, CsvProvider, DataProvider, SyntheticProvider, YahooProvider};
use finanz_core::strategy::{Crossover, ScheduledSignals, StrategyRegistry};
use finanz_core::BacktestError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::DEFAULT_INITIAL_CAPITAL;
use crate::runner::Backtester;

/// Environment variable overriding the initial capital.
pub const INITIAL_CAPITAL_ENV: &str = "FINANZ_INITIAL_CAPITAL";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Backtest(#[from] BacktestError),

    #[error("data provider setup failed: {0}")]
    Provider(String),
}

/// Which provider backs the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Yahoo,
    Csv,
    Synthetic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Yahoo,
        ProviderKind::Csv,
        ProviderKind::Synthetic,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::Yahoo => "yahoo",
            ProviderKind::Csv => "csv",
            ProviderKind::Synthetic => "synthetic",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "unknown provider '{s}' (valid: yahoo, csv, synthetic)"
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub initial_capital: f64,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverSection {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for CrossoverSection {
    fn default() -> Self {
        Self {
            short_window: Crossover::DEFAULT_SHORT_WINDOW,
            long_window: Crossover::DEFAULT_LONG_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub provider: ProviderKind,
    pub csv_dir: PathBuf,
    /// Substitute tagged synthetic bars when the provider fails.
    pub synthetic_fallback: bool,
    /// Bar cache entries; 0 disables the cache.
    pub cache_capacity: usize,
    /// `date,signal` CSV backing the external-signal strategy.
    pub signals_file: Option<PathBuf>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            csv_dir: PathBuf::from("data"),
            synthetic_fallback: false,
            cache_capacity: 64,
            signals_file: None,
        }
    }
}

/// Full configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub crossover: CrossoverSection,
    pub data: DataSection,
}

impl BacktestConfig {
    /// Load from a TOML file and apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string. No environment overrides.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(INITIAL_CAPITAL_ENV) {
            self.backtest.initial_capital = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{INITIAL_CAPITAL_ENV}={raw} is not a number"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capital = self.backtest.initial_capital;
        if !capital.is_finite() || capital <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "backtest.initial_capital must be positive, got {capital}"
            )));
        }
        let CrossoverSection {
            short_window,
            long_window,
        } = self.crossover;
        if short_window == 0 || long_window <= short_window {
            return Err(ConfigError::Invalid(format!(
                "crossover windows must satisfy 1 <= short < long, got {short_window}/{long_window}"
            )));
        }
        Ok(())
    }

    /// Registry with the built-ins, plus the external-signal strategy when a
    /// signals file is configured.
    pub fn build_registry(&self) -> Result<StrategyRegistry, ConfigError> {
        let crossover = Crossover::new(self.crossover.short_window, self.crossover.long_window)?;
        let mut registry = StrategyRegistry::with_builtins(crossover);
        if let Some(path) = &self.data.signals_file {
            let source = ScheduledSignals::from_csv(path)?;
            registry.register_signal_source(Arc::new(source));
        }
        Ok(registry)
    }

    /// Provider stack for `data.provider`, wrapped in the bar cache.
    pub fn build_provider(&self) -> Result<Box<dyn DataProvider>, ConfigError> {
        let inner: Box<dyn DataProvider> = match self.data.provider {
            ProviderKind::Yahoo => Box::new(
                YahooProvider::new().map_err(|e| ConfigError::Provider(e.to_string()))?,
            ),
            ProviderKind::Csv => Box::new(CsvProvider::new(&self.data.csv_dir)),
            ProviderKind::Synthetic => Box::new(SyntheticProvider),
        };
        Ok(Box::new(CachedProvider::new(inner, self.data.cache_capacity)))
    }

    /// Assemble a [`Backtester`] from this configuration.
    pub fn build_backtester(&self) -> Result<Backtester, ConfigError> {
        Ok(Backtester::new(self.build_provider()?, self.build_registry()?)
            .with_synthetic_fallback(self.data.synthetic_fallback))
    }
}
