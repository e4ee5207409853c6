//! # Long-Bull Database Crate
//!
//! The system's permanent archive: stocks and their daily bars, the latest trend verdicts,
//! optimized strategies and the bookkeeping of every analysis run.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** the rest of the application talks to the [`StockRepository`] trait and never
//!   sees SQL. [`PgRepository`] is the production implementation; [`InMemoryRepository`] backs
//!   offline runs and tests.
//! - **Replace or clear:** a verdict or strategy is either fully replaced or deleted, never
//!   merged with a previous one.
//! - **Asynchronous & Pooled:** all operations are async over a shared `PgPool`.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod ingest;
pub mod memory;
pub mod postgres;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use ingest::{import_snapshots, parse_snapshots, read_snapshots};
pub use memory::InMemoryRepository;
pub use postgres::PgRepository;
pub use repository::{LabeledStock, StockRepository, stored_verdict};
