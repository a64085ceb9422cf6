//! Backtest runner: wires together data loading, the simulator, and metrics.
//!
//! Entry points on [`Backtester`]:
//! - `run()`: validate, resolve the strategy, load bars, simulate, score.
//! - `run_on_bars()`: same, for bars the caller already holds. No I/O.
//! - `run_batch()`: independent requests in parallel.
//! - `compare()`: several strategies over one loaded series.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use finanz_core::data::{DataProvider, DataSource};
use finanz_core::domain::{Bar, Trade, ValuePoint};
use finanz_core::engine::simulate;
use finanz_core::strategy::{StrategyKind, StrategyRegistry};
use finanz_core::BacktestError;

use crate::data_loader::{compute_dataset_hash, load_bars, LoadOptions, LoadedData};
use crate::metrics::PerformanceMetrics;
use crate::request::RunRequest;

/// Current schema version for serialized results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub strategy: StrategyKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<Trade>,
    pub value_history: Vec<ValuePoint>,
    /// `None` when the caller supplied the bars directly.
    pub data_source: Option<DataSource>,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub bar_count: usize,
    pub signal_count: usize,
    pub ignored_signals: usize,
    pub warmup_bars: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Where a run's bars came from.
struct Provenance {
    source: Option<DataSource>,
    dataset_hash: String,
    has_synthetic: bool,
}

impl From<&LoadedData> for Provenance {
    fn from(loaded: &LoadedData) -> Self {
        Self {
            source: Some(loaded.source),
            dataset_hash: loaded.dataset_hash.clone(),
            has_synthetic: loaded.has_synthetic,
        }
    }
}

/// The backtest orchestrator.
pub struct Backtester {
    provider: Box<dyn DataProvider>,
    registry: StrategyRegistry,
    synthetic_fallback: bool,
}

impl Backtester {
    pub fn new(provider: Box<dyn DataProvider>, registry: StrategyRegistry) -> Self {
        Self {
            provider,
            registry,
            synthetic_fallback: false,
        }
    }

    /// Fall back to tagged synthetic data when the provider fails.
    pub fn with_synthetic_fallback(mut self, enabled: bool) -> Self {
        self.synthetic_fallback = enabled;
        self
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn provider(&self) -> &dyn DataProvider {
        self.provider.as_ref()
    }

    fn load_options(&self, request: &RunRequest) -> LoadOptions {
        LoadOptions {
            start: request.start_date,
            end: request.end_date,
            synthetic: self.synthetic_fallback,
        }
    }

    /// Run one backtest end to end.
    pub fn run(&self, request: &RunRequest) -> Result<BacktestResult, BacktestError> {
        request.validate()?;
        // Resolve before fetching so unknown strategies cost no I/O.
        self.registry.build(request.strategy)?;

        let loaded = load_bars(&request.symbol, self.provider.as_ref(), &self.load_options(request))?;
        self.run_loaded(request, &loaded.bars, &Provenance::from(&loaded))
    }

    /// Run on bars the caller already holds.
    pub fn run_on_bars(
        &self,
        request: &RunRequest,
        bars: &[Bar],
    ) -> Result<BacktestResult, BacktestError> {
        request.validate()?;
        let provenance = Provenance {
            source: None,
            dataset_hash: compute_dataset_hash(&request.symbol, bars),
            has_synthetic: false,
        };
        self.run_loaded(request, bars, &provenance)
    }

    /// Run independent requests in parallel. Results keep request order.
    pub fn run_batch(&self, requests: &[RunRequest]) -> Vec<Result<BacktestResult, BacktestError>> {
        requests.par_iter().map(|r| self.run(r)).collect()
    }

    /// Load `request`'s series once and run each strategy in `kinds` on it.
    pub fn compare(
        &self,
        request: &RunRequest,
        kinds: &[StrategyKind],
    ) -> Result<Vec<BacktestResult>, BacktestError> {
        request.validate()?;
        for &kind in kinds {
            self.registry.build(kind)?;
        }

        let loaded = load_bars(&request.symbol, self.provider.as_ref(), &self.load_options(request))?;
        let provenance = Provenance::from(&loaded);
        kinds
            .par_iter()
            .map(|&kind| self.run_loaded(&request.for_strategy(kind), &loaded.bars, &provenance))
            .collect()
    }

    fn run_loaded(
        &self,
        request: &RunRequest,
        bars: &[Bar],
        provenance: &Provenance,
    ) -> Result<BacktestResult, BacktestError> {
        let strategy = self.registry.build(request.strategy)?;

        info!(
            symbol = %request.symbol,
            strategy = strategy.name(),
            bars = bars.len(),
            initial_capital = request.initial_capital,
            "running backtest"
        );
        if provenance.has_synthetic {
            warn!(symbol = %request.symbol, "backtest is running on synthetic data");
        }

        let sim = simulate(bars, strategy.as_ref(), request.initial_capital)?;
        let portfolio = sim.portfolio;
        let metrics = PerformanceMetrics::compute(
            &portfolio.value_history,
            &portfolio.trade_log,
            request.initial_capital,
        );

        info!(
            symbol = %request.symbol,
            strategy = strategy.name(),
            total_return = metrics.total_return,
            sharpe = metrics.sharpe_ratio,
            trades = metrics.num_trades,
            "backtest complete"
        );

        Ok(BacktestResult {
            schema_version: SCHEMA_VERSION,
            symbol: request.symbol.clone(),
            strategy: request.strategy,
            start_date: request.start_date,
            end_date: request.end_date,
            initial_capital: request.initial_capital,
            metrics,
            bar_count: portfolio.value_history.len(),
            trades: portfolio.trade_log,
            value_history: portfolio.value_history,
            data_source: provenance.source,
            dataset_hash: provenance.dataset_hash.clone(),
            has_synthetic: provenance.has_synthetic,
            signal_count: sim.signal_count,
            ignored_signals: sim.ignored_signals,
            warmup_bars: strategy.warmup_bars(),
        })
    }
}

impl std::fmt::Debug for Backtester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backtester")
            .field("provider", &self.provider.name())
            .field("registry", &self.registry)
            .field("synthetic_fallback", &self.synthetic_fallback)
            .finish()
    }
}
