//! # Counterparty Max
//!
//! Finds, for every user in a transaction log, the counterparty (or
//! counterparties, on a tie) that received the largest total amount.
//!
//! ## Usage
//!
//! ```bash
//! counterparty-max [run] [--input data/Transaction.csv] [--format table|json|csv|markdown]
//! counterparty-max schema [--input data/Transaction.csv]
//! ```
//!
//! ## Modules
//!
//! - `aggregation` - Pair totals, per-user maximum selection and result formatting
//! - `config` - Layered configuration (defaults, TOML file, environment)
//! - `context` - Execution context shared by a run (settings and worker pool)
//! - `error` - Error types and exit codes
//! - `pipeline` - Source to formatted output wiring
//! - `source` - Record sources, including CSV with schema inference
//! - `types` - Transaction and result row types
pub mod aggregation;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod types;

pub use aggregation::{top_counterparties, Aggregation, Aggregator};
pub use context::{ExecutionContext, InvalidRecordPolicy};
pub use error::{Error, Result};
pub use types::{PartyId, ResultRow, Transaction};
