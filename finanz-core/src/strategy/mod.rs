//! Strategy decision functions: per-bar BUY / SELL / HOLD.
//!
//! Strategies are portfolio-agnostic: they receive the bar history up to and
//! including the current bar, never portfolio or position state. The simulator
//! decides whether a signal is actionable (a BUY while holding is ignored).

pub mod buy_and_hold;
pub mod crossover;
pub mod external;
pub mod registry;

pub use buy_and_hold::BuyAndHold;
pub use crossover::Crossover;
pub use external::{ExternalSignal, ScheduledSignals, SignalSource};
pub use registry::{StrategyKind, StrategyRegistry};

use crate::domain::Bar;
use serde::{Deserialize, Serialize};

/// A strategy's decision for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl std::str::FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Signal::Buy),
            "SELL" => Ok(Signal::Sell),
            "HOLD" => Ok(Signal::Hold),
            other => Err(format!("unknown signal '{other}' (expected BUY, SELL or HOLD)")),
        }
    }
}

/// Trait for strategy decision functions.
///
/// # Architecture invariant
/// `decide` must only use `history`, which ends at the current bar. The
/// simulator passes `&bars[..=i]`, so reading the future is impossible.
pub trait Strategy: Send + Sync {
    /// Human-readable name (e.g., "crossover").
    fn name(&self) -> &str;

    /// Number of prior bars needed before this strategy can signal.
    fn warmup_bars(&self) -> usize {
        0
    }

    /// Decide for the last bar of `history`. `history` is never empty.
    fn decide(&self, history: &[Bar]) -> Signal;
}
