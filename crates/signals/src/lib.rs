//! # Signal Evaluator
//!
//! Applies a stock's optimized thresholds to its latest bar and reports live buy/sell
//! triggers and near misses. The comparisons mirror the backtester's entry and exit rules.

pub mod error;
pub mod evaluator;
mod message;

pub use error::SignalError;
pub use evaluator::{Evaluation, SignalEvaluator, SkipReason};
