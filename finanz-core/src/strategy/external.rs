//! External-signal strategy: delegates every decision to an injected source.
//!
//! The simulator is agnostic to how the signal is produced: a trained model,
//! a schedule of precomputed predictions, or a closure in a test.

use super::{Signal, Strategy};
use crate::domain::Bar;
use crate::error::BacktestError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Anything that can produce a per-bar signal from bar history.
pub trait SignalSource: Send + Sync {
    fn name(&self) -> &str {
        "external"
    }

    /// Signal for the last bar of `history`.
    fn signal(&self, history: &[Bar]) -> Signal;
}

impl<F> SignalSource for F
where
    F: Fn(&[Bar]) -> Signal + Send + Sync,
{
    fn signal(&self, history: &[Bar]) -> Signal {
        self(history)
    }
}

/// Strategy wrapper around a shared [`SignalSource`].
#[derive(Clone)]
pub struct ExternalSignal {
    source: Arc<dyn SignalSource>,
}

impl ExternalSignal {
    pub fn new(source: Arc<dyn SignalSource>) -> Self {
        Self { source }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

impl std::fmt::Debug for ExternalSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalSignal")
            .field("source", &self.source.name())
            .finish()
    }
}

impl Strategy for ExternalSignal {
    fn name(&self) -> &str {
        "external-signal"
    }

    fn decide(&self, history: &[Bar]) -> Signal {
        self.source.signal(history)
    }
}

/// Date-keyed signal schedule, e.g. model predictions computed offline.
///
/// Bars whose date is not in the schedule HOLD.
#[derive(Debug, Clone, Default)]
pub struct ScheduledSignals {
    name: String,
    schedule: BTreeMap<NaiveDate, Signal>,
}

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    date: NaiveDate,
    signal: String,
}

impl ScheduledSignals {
    pub fn new(name: impl Into<String>, schedule: BTreeMap<NaiveDate, Signal>) -> Self {
        Self {
            name: name.into(),
            schedule,
        }
    }

    /// Load a `date,signal` CSV (header required, signal is BUY/SELL/HOLD).
    pub fn from_csv(path: &Path) -> Result<Self, BacktestError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            BacktestError::invalid(format!("cannot open signal file {}: {e}", path.display()))
        })?;

        let mut schedule = BTreeMap::new();
        for (line, row) in reader.deserialize::<ScheduleRow>().enumerate() {
            let row = row.map_err(|e| {
                BacktestError::invalid(format!("signal file row {}: {e}", line + 2))
            })?;
            let signal = row
                .signal
                .parse::<Signal>()
                .map_err(|e| BacktestError::invalid(format!("signal file row {}: {e}", line + 2)))?;
            schedule.insert(row.date, signal);
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scheduled".to_string());
        Ok(Self::new(name, schedule))
    }

    pub fn len(&self) -> usize {
        self.schedule.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty()
    }
}

impl SignalSource for ScheduledSignals {
    fn name(&self) -> &str {
        &self.name
    }

    fn signal(&self, history: &[Bar]) -> Signal {
        history
            .last()
            .and_then(|bar| self.schedule.get(&bar.date).copied())
            .unwrap_or(Signal::Hold)
    }
}
