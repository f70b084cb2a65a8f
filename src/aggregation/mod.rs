//! Counterparty aggregation
//!
//! Finds, for every user, the counterparties that received the largest
//! cumulative amount. The work is an explicit two-stage reduction:
//!
//! 1. sum amounts per (user, counterparty) pair ([`PairTotals`]),
//! 2. take the maximum per user and keep every pair equal to it
//!    ([`per_user_maximum`], [`select_top`]).
//!
//! Stage two only ever sees fully merged totals. The aggregator does no I/O
//! and no logging; every failure is returned to the caller.

pub mod amount;
pub mod formatter;
pub mod pairs;
pub mod selector;

pub use amount::Amount;
pub use formatter::{FormatType, OutputFormatter};
pub use pairs::PairTotals;
pub use selector::{per_user_maximum, select_top};

use crate::context::{ExecutionContext, InvalidRecordPolicy};
use crate::error::{ArithmeticError, InvalidRecordError, Result};
use crate::types::{ResultRow, Transaction};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt::Display;

/// Counts describing one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregationSummary {
    /// Records offered to the aggregator, valid or not.
    pub records_read: usize,
    pub records_skipped: usize,
    pub pairs: usize,
    pub users: usize,
    pub rows: usize,
}

/// Result of one aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation<K, A> {
    pub rows: Vec<ResultRow<K, A>>,
    /// Records dropped under [`InvalidRecordPolicy::Skip`].
    pub skipped: Vec<InvalidRecordError>,
    pub summary: AggregationSummary,
}

/// Sequential top-counterparty selection over well-formed transactions.
pub fn top_counterparties<K, A, I>(transactions: I) -> std::result::Result<Vec<ResultRow<K, A>>, ArithmeticError>
where
    K: Ord + Clone + Display,
    A: Amount,
    I: IntoIterator<Item = Transaction<K, A>>,
{
    let totals = PairTotals::from_transactions(transactions)?;
    let maxima = per_user_maximum(&totals);
    Ok(select_top(&totals, &maxima))
}

/// Aggregator bound to an execution context.
///
/// The context supplies the invalid record policy, the partition count and
/// the worker pool used for partial sums.
pub struct Aggregator<'ctx> {
    ctx: &'ctx ExecutionContext,
}

impl<'ctx> Aggregator<'ctx> {
    pub fn new(ctx: &'ctx ExecutionContext) -> Self {
        Self { ctx }
    }

    /// Aggregate records that may have failed to parse.
    pub fn aggregate<K, A, I>(&self, records: I) -> Result<Aggregation<K, A>>
    where
        K: Ord + Clone + Display + Send + Sync,
        A: Amount,
        I: IntoIterator<Item = std::result::Result<Transaction<K, A>, InvalidRecordError>>,
    {
        let mut transactions = Vec::new();
        let mut skipped = Vec::new();
        for record in records {
            match record {
                Ok(transaction) => transactions.push(transaction),
                Err(invalid) => match self.ctx.invalid_records() {
                    InvalidRecordPolicy::Abort => return Err(invalid.into()),
                    InvalidRecordPolicy::Skip => skipped.push(invalid),
                },
            }
        }
        let records_read = transactions.len() + skipped.len();

        let totals = self.sum_pairs(transactions)?;
        let maxima = per_user_maximum(&totals);
        let rows = select_top(&totals, &maxima);

        let summary = AggregationSummary {
            records_read,
            records_skipped: skipped.len(),
            pairs: totals.pair_count(),
            users: totals.user_count(),
            rows: rows.len(),
        };
        Ok(Aggregation {
            rows,
            skipped,
            summary,
        })
    }

    /// Aggregate transactions that are already known to be well formed.
    pub fn aggregate_transactions<K, A, I>(&self, transactions: I) -> Result<Aggregation<K, A>>
    where
        K: Ord + Clone + Display + Send + Sync,
        A: Amount,
        I: IntoIterator<Item = Transaction<K, A>>,
    {
        self.aggregate(transactions.into_iter().map(Ok))
    }

    /// Stage one. Partitions are summed on the worker pool and merged in
    /// partition order, so the result does not depend on scheduling.
    fn sum_pairs<K, A>(&self, transactions: Vec<Transaction<K, A>>) -> Result<PairTotals<K, A>>
    where
        K: Ord + Clone + Display + Send + Sync,
        A: Amount,
    {
        let partitions = partition(transactions, self.ctx.shuffle_partitions());
        if partitions.len() <= 1 {
            let totals = PairTotals::from_transactions(partitions.into_iter().flatten())?;
            return Ok(totals);
        }

        let partials: Vec<std::result::Result<PairTotals<K, A>, ArithmeticError>> =
            self.ctx.install(|| {
                partitions
                    .into_par_iter()
                    .map(PairTotals::from_transactions)
                    .collect()
            });

        let mut totals = PairTotals::new();
        for partial in partials {
            totals.merge(partial?)?;
        }
        Ok(totals)
    }
}

/// Split into at most `count` contiguous, non-empty partitions.
fn partition<T>(mut items: Vec<T>, count: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let size = items.len().div_ceil(count.max(1));
    let mut partitions = Vec::with_capacity(count);
    while items.len() > size {
        let rest = items.split_off(size);
        partitions.push(items);
        items = rest;
    }
    partitions.push(items);
    partitions
}
