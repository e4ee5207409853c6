//! # Long-Bull Core Types
//!
//! The foundational data structures shared by every other crate: price bars and series,
//! fundamentals, trend verdicts, optimized strategy parameters and live signals.
//!
//! As a Layer 0 crate it depends on nothing else in the workspace.

pub mod enums;
pub mod error;
pub mod series;
pub mod signal;
pub mod strategy;
pub mod structs;
pub mod trend;

// Re-export the core types to provide a clean public API.
pub use enums::{SignalKind, StrategyVariant};
pub use error::CoreError;
pub use series::PriceSeries;
pub use signal::{SignalHit, SignalReport};
pub use strategy::{StrategyParams, round_decimal};
pub use structs::{Fundamentals, PricePoint, StockListing, StockSnapshot};
pub use trend::{Classification, RejectReason, TrendLabel, TrendVerdict};
