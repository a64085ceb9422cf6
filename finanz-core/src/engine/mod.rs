//! Backtesting engine: the bar-by-bar portfolio simulator.
//!
//! The engine consumes a validated, chronologically ordered bar series and a
//! strategy, and replays the strategy's decisions against a single-position
//! portfolio:
//!
//! 1. Decide: query the strategy with the history up to the current bar
//! 2. Execute: BUY when flat, SELL when holding, otherwise ignore
//! 3. Mark: record cash + shares * close in the value history

pub mod simulator;

pub use simulator::{simulate, validate_inputs, Simulation};
