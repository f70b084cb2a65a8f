//! Record sources
//!
//! A record source hands the aggregator a finite batch of parsed records.
//! Records that could not be parsed stay in the batch as errors so the
//! aggregator can apply the context's invalid record policy.

pub mod delimited;
pub mod schema;

pub use delimited::{CsvOptions, CsvRecordSource};
pub use schema::{AmountType, ColumnNames, ColumnType, DeclaredSchema, IdType, Schema};

use crate::context::ExecutionContext;
use crate::error::{InvalidRecordError, Result};
use crate::types::{PartyId, Transaction};
use async_trait::async_trait;

/// A parsed record, or the reason it could not become a transaction.
pub type RecordResult<A> = std::result::Result<Transaction<PartyId, A>, InvalidRecordError>;

/// Records of one load, typed by the resolved amount column.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionBatch {
    Integer(Vec<RecordResult<i64>>),
    Double(Vec<RecordResult<f64>>),
}

impl TransactionBatch {
    pub fn len(&self) -> usize {
        match self {
            TransactionBatch::Integer(records) => records.len(),
            TransactionBatch::Double(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn amount_type(&self) -> AmountType {
        match self {
            TransactionBatch::Integer(_) => AmountType::Integer,
            TransactionBatch::Double(_) => AmountType::Double,
        }
    }
}

impl From<Vec<Transaction<PartyId, i64>>> for TransactionBatch {
    fn from(transactions: Vec<Transaction<PartyId, i64>>) -> Self {
        TransactionBatch::Integer(transactions.into_iter().map(Ok).collect())
    }
}

impl From<Vec<Transaction<PartyId, f64>>> for TransactionBatch {
    fn from(transactions: Vec<Transaction<PartyId, f64>>) -> Self {
        TransactionBatch::Double(transactions.into_iter().map(Ok).collect())
    }
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human readable location, used in logs and errors.
    fn describe(&self) -> String;

    async fn load(&self, ctx: &ExecutionContext) -> Result<TransactionBatch>;
}

/// Serves a batch that is already in memory.
#[derive(Debug, Clone)]
pub struct MemoryRecordSource {
    batch: TransactionBatch,
}

impl MemoryRecordSource {
    pub fn new(batch: impl Into<TransactionBatch>) -> Self {
        Self {
            batch: batch.into(),
        }
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    fn describe(&self) -> String {
        format!("memory ({} records)", self.batch.len())
    }

    async fn load(&self, _ctx: &ExecutionContext) -> Result<TransactionBatch> {
        Ok(self.batch.clone())
    }
}
