//! Source → aggregator → formatter wiring used by the binary.

use crate::aggregation::{Aggregator, Amount, AggregationSummary, OutputFormatter};
use crate::context::ExecutionContext;
use crate::error::{InvalidRecordError, Result};
use crate::source::{AmountType, RecordResult, RecordSource, TransactionBatch};
use tracing::{debug, info, warn};

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Formatted result set.
    pub output: String,
    pub summary: AggregationSummary,
    pub amount_type: AmountType,
    pub skipped: Vec<InvalidRecordError>,
}

/// Load every record from `source`, aggregate on the context's pool and
/// format the result rows.
pub async fn run(
    ctx: &ExecutionContext,
    source: &dyn RecordSource,
    formatter: &OutputFormatter,
) -> Result<RunReport> {
    info!(app_name = ctx.app_name(), "Loading records from {}", source.describe());
    let batch = source.load(ctx).await?;
    let amount_type = batch.amount_type();
    debug!(
        records = batch.len(),
        %amount_type,
        partitions = ctx.shuffle_partitions(),
        "Aggregating"
    );

    let task_ctx = ctx.clone();
    let task_formatter = formatter.clone();
    let report = tokio::task::spawn_blocking(move || {
        aggregate_batch(&task_ctx, batch, &task_formatter)
    })
    .await??;

    for invalid in &report.skipped {
        warn!("Skipped {}", invalid);
    }
    info!(
        records_read = report.summary.records_read,
        records_skipped = report.summary.records_skipped,
        pairs = report.summary.pairs,
        users = report.summary.users,
        rows = report.summary.rows,
        "Aggregation finished"
    );

    Ok(report)
}

fn aggregate_batch(
    ctx: &ExecutionContext,
    batch: TransactionBatch,
    formatter: &OutputFormatter,
) -> Result<RunReport> {
    match batch {
        TransactionBatch::Integer(records) => {
            aggregate_records(ctx, records, formatter, AmountType::Integer)
        }
        TransactionBatch::Double(records) => {
            aggregate_records(ctx, records, formatter, AmountType::Double)
        }
    }
}

fn aggregate_records<A: Amount>(
    ctx: &ExecutionContext,
    records: Vec<RecordResult<A>>,
    formatter: &OutputFormatter,
    amount_type: AmountType,
) -> Result<RunReport> {
    let aggregation = Aggregator::new(ctx).aggregate(records)?;
    let output = formatter.format(&aggregation)?;
    Ok(RunReport {
        output,
        summary: aggregation.summary,
        amount_type,
        skipped: aggregation.skipped,
    })
}
