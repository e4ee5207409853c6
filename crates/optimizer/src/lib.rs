//! # Grid Optimizer
//!
//! Finds the best (buy, sell) bias thresholds for a stock by backtesting every cell of a
//! fixed grid over the stock's trend window. Stocks are independent, so the batch driver
//! fans them out over a [`WorkerPool`]; a single stock's grid is searched sequentially and
//! polls its cancellation token between cells.

pub mod error;
pub mod generator;
pub mod pool;
pub mod search;

pub use error::OptimizerError;
pub use generator::{GridCell, generate_grid};
pub use pool::{TaskOutcome, WorkerPool};
pub use search::{GridOptimizer, MIN_PRICE, OptimizationJob, PreparedWindow, SearchResult};
