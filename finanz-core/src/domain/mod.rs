//! Domain types for a single-asset backtest.

pub mod bar;
pub mod portfolio;
pub mod trade;

pub use bar::Bar;
pub use portfolio::{Portfolio, ValuePoint, MAX_POSITION_SHARES};
pub use trade::{Side, Trade};
