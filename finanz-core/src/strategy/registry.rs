//! Strategy registry: maps a strategy identifier to a decision function.
//!
//! The simulator only sees `&dyn Strategy`; adding a strategy means
//! registering a factory here, never touching the simulator.

use super::{BuyAndHold, Crossover, ExternalSignal, SignalSource, Strategy};
use crate::error::BacktestError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// The known strategy identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StrategyKind {
    Crossover,
    BuyAndHold,
    ExternalSignal,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Crossover,
        StrategyKind::BuyAndHold,
        StrategyKind::ExternalSignal,
    ];

    /// Canonical identifier.
    pub fn id(&self) -> &'static str {
        match self {
            StrategyKind::Crossover => "crossover",
            StrategyKind::BuyAndHold => "buy-and-hold",
            StrategyKind::ExternalSignal => "external-signal",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = BacktestError;

    /// Accepts the canonical ids plus the legacy `sma_crossover`,
    /// `buy_and_hold` and `ml_predictions` names. Anything else fails.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "crossover" | "sma-crossover" => Ok(StrategyKind::Crossover),
            "buy-and-hold" => Ok(StrategyKind::BuyAndHold),
            "external-signal" | "ml-predictions" => Ok(StrategyKind::ExternalSignal),
            _ => Err(BacktestError::UnknownStrategy(s.to_string())),
        }
    }
}

impl TryFrom<String> for StrategyKind {
    type Error = BacktestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StrategyKind> for String {
    fn from(kind: StrategyKind) -> Self {
        kind.id().to_string()
    }
}

type StrategyFactory = Box<dyn Fn() -> Box<dyn Strategy> + Send + Sync>;

/// Registry of strategy factories. Each run gets a fresh strategy instance.
pub struct StrategyRegistry {
    factories: HashMap<StrategyKind, StrategyFactory>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with crossover (using the given windows) and buy-and-hold.
    ///
    /// External-signal needs a source, see [`Self::register_signal_source`].
    pub fn with_builtins(crossover: Crossover) -> Self {
        let mut registry = Self::new();
        registry.register(StrategyKind::Crossover, move || {
            Box::new(crossover.clone()) as Box<dyn Strategy>
        });
        registry.register(StrategyKind::BuyAndHold, || {
            Box::new(BuyAndHold) as Box<dyn Strategy>
        });
        registry
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register<F>(&mut self, kind: StrategyKind, factory: F)
    where
        F: Fn() -> Box<dyn Strategy> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
    }

    /// Register the external-signal strategy backed by `source`.
    pub fn register_signal_source(&mut self, source: Arc<dyn SignalSource>) {
        self.register(StrategyKind::ExternalSignal, move || {
            Box::new(ExternalSignal::new(Arc::clone(&source))) as Box<dyn Strategy>
        });
    }

    pub fn contains(&self, kind: StrategyKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Registered kinds in canonical order.
    pub fn kinds(&self) -> Vec<StrategyKind> {
        let mut kinds: Vec<StrategyKind> = self.factories.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Build a fresh strategy, failing fast for unregistered kinds.
    pub fn build(&self, kind: StrategyKind) -> Result<Box<dyn Strategy>, BacktestError> {
        self.factories
            .get(&kind)
            .map(|factory| factory())
            .ok_or_else(|| BacktestError::UnknownStrategy(kind.id().to_string()))
    }

    /// Parse a strategy name and build it.
    pub fn resolve(&self, name: &str) -> Result<Box<dyn Strategy>, BacktestError> {
        self.build(name.parse()?)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins(Crossover::default())
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;
    use crate::strategy::Signal;

    #[test]
    fn parses_canonical_and_legacy_names() {
        assert_eq!("crossover".parse::<StrategyKind>().unwrap(), StrategyKind::Crossover);
        assert_eq!("sma_crossover".parse::<StrategyKind>().unwrap(), StrategyKind::Crossover);
        assert_eq!("buy-and-hold".parse::<StrategyKind>().unwrap(), StrategyKind::BuyAndHold);
        assert_eq!("buy_and_hold".parse::<StrategyKind>().unwrap(), StrategyKind::BuyAndHold);
        assert_eq!(
            "ml_predictions".parse::<StrategyKind>().unwrap(),
            StrategyKind::ExternalSignal
        );
    }

    #[test]
    fn unknown_name_fails_instead_of_defaulting() {
        let err = "momentum".parse::<StrategyKind>().unwrap_err();
        assert_eq!(err, BacktestError::UnknownStrategy("momentum".into()));
    }

    #[test]
    fn kind_serde_uses_ids() {
        let json = serde_json::to_string(&StrategyKind::BuyAndHold).unwrap();
        assert_eq!(json, "\"buy-and-hold\"");
        let kind: StrategyKind = serde_json::from_str("\"external-signal\"").unwrap();
        assert_eq!(kind, StrategyKind::ExternalSignal);
        assert!(serde_json::from_str::<StrategyKind>("\"random\"").is_err());
    }

    #[test]
    fn builtins_exclude_external_signal() {
        let registry = StrategyRegistry::default();
        assert_eq!(
            registry.kinds(),
            vec![StrategyKind::Crossover, StrategyKind::BuyAndHold]
        );
        assert!(matches!(
            registry.build(StrategyKind::ExternalSignal),
            Err(BacktestError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn registered_signal_source_builds() {
        let mut registry = StrategyRegistry::default();
        registry.register_signal_source(Arc::new(|_: &[Bar]| Signal::Sell));
        let strategy = registry.resolve("external-signal").unwrap();
        assert_eq!(strategy.name(), "external-signal");
    }

    #[test]
    fn crossover_factory_uses_configured_windows() {
        let registry = StrategyRegistry::with_builtins(Crossover::new(5, 20).unwrap());
        let strategy = registry.build(StrategyKind::Crossover).unwrap();
        assert_eq!(strategy.warmup_bars(), 20);
    }
}
