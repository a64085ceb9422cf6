//! Finanz Core: domain types, price providers, strategies and the portfolio simulator.
//!
//! This crate contains the heart of the backtesting engine:
//! - Domain types (bars, trades, portfolio state, value history)
//! - Price series providers (Yahoo Finance, CSV import, synthetic) and a bounded bar cache
//! - Rolling indicators used by the built-in strategies
//! - Pluggable strategy decision functions and the strategy registry
//! - The bar-by-bar portfolio simulator

pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod strategy;

pub use error::BacktestError;
