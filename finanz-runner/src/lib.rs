//! Finanz Runner: backtest orchestration, data loading policy, metrics.
//!
//! This crate builds on `finanz-core` to provide:
//! - Data loading with synthetic fallback and dataset hashing
//! - The backtest orchestrator (single, batch, and strategy comparison runs)
//! - Performance metrics
//! - Run request/response payloads
//! - TOML configuration with environment overrides

pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod request;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, ProviderKind};
pub use data_loader::{load_bars, LoadError, LoadOptions, LoadedData};
pub use metrics::PerformanceMetrics;
pub use request::{RunRequest, RunResponse, DEFAULT_INITIAL_CAPITAL};
pub use runner::{BacktestResult, Backtester, SCHEMA_VERSION};
