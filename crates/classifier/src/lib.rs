//! # Trend Classifier
//!
//! Grades stocks as long-bull trends: fundamentals pre-gates, a dead-cross circuit breaker on
//! the full history, then a log-linear regression over trailing calendar windows (longest
//! first) guarded by coverage, liquidity and moving-average interruption checks.

pub mod classifier;
pub mod diagnostics;
pub mod error;
pub mod regression;
pub mod window;

pub use classifier::TrendClassifier;
pub use diagnostics::{BreakerCheck, Diagnosis, GateCheck, WindowChecks, WindowDiagnosis};
pub use error::ClassifierError;
pub use regression::{LinearFit, fit_log_linear, ols};
pub use window::window_start;
