//! Delimited text (CSV) record source.

use super::schema::{
    parse_double_amount, parse_id, parse_integer_amount, AmountType, ColumnNames, DeclaredSchema,
    Schema,
};
use super::{RecordResult, RecordSource, TransactionBatch};
use crate::context::ExecutionContext;
use crate::error::{Error, Field, InvalidRecordError, Result};
use crate::types::Transaction;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// First line names the columns. Without a header, columns are named
    /// `_c0`, `_c1`, ...
    pub has_header: bool,
    pub delimiter: u8,
    pub columns: ColumnNames,
    pub schema: DeclaredSchema,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            columns: ColumnNames::default(),
            schema: DeclaredSchema::default(),
        }
    }
}

/// Records and resolved schema of one parsed file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCsv {
    pub schema: Schema,
    pub batch: TransactionBatch,
}

pub struct CsvRecordSource {
    path: PathBuf,
    options: CsvOptions,
}

impl CsvRecordSource {
    pub fn new(path: impl Into<PathBuf>, options: CsvOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    /// Read and parse the file, keeping the resolved schema.
    pub async fn read(&self) -> Result<ParsedCsv> {
        let location = self.describe();
        let data = fs::read(&self.path)
            .await
            .map_err(|e| Error::source_unavailable(&location, e))?;
        debug!("Read {} bytes from {}", data.len(), location);
        parse(&data, &self.options, &location)
    }
}

#[async_trait]
impl RecordSource for CsvRecordSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self, ctx: &ExecutionContext) -> Result<TransactionBatch> {
        let parsed = self.read().await?;
        info!(
            app_name = ctx.app_name(),
            records = parsed.batch.len(),
            amount_type = %parsed.schema.amount,
            "Loaded records from {}",
            self.describe()
        );
        Ok(parsed.batch)
    }
}

/// Parse delimited text into a typed batch.
///
/// Missing columns and undecodable input make the whole source unavailable;
/// problems confined to one row become invalid records.
pub fn parse(data: &[u8], options: &CsvOptions, location: &str) -> Result<ParsedCsv> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(options.has_header)
        .delimiter(options.delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::source_unavailable(location, e))?;
        let line = record.position().map_or(0, |position| position.line());
        rows.push((line, record));
    }

    let header: Vec<String> = if options.has_header {
        reader
            .headers()
            .map_err(|e| Error::source_unavailable(location, e))?
            .iter()
            .map(str::to_string)
            .collect()
    } else {
        let width = rows.iter().map(|(_, record)| record.len()).max().unwrap_or(0);
        (0..width).map(|index| format!("_c{index}")).collect()
    };

    let indices = [
        column_index(&header, &options.columns.user_id, location)?,
        column_index(&header, &options.columns.counterparty_id, location)?,
        column_index(&header, &options.columns.amount, location)?,
    ];

    let cells: Vec<(u64, [Option<&str>; 3])> = rows
        .iter()
        .map(|(line, record)| {
            let cells = indices.map(|index| record.get(index).filter(|cell| !cell.is_empty()));
            (*line, cells)
        })
        .collect();

    let samples: Vec<[Option<&str>; 3]> = cells.iter().map(|(_, row)| *row).collect();
    let schema = Schema::resolve(options.columns.clone(), &options.schema, &samples);
    debug!(
        user_id = %schema.user_id,
        counterparty_id = %schema.counterparty_id,
        amount = %schema.amount,
        "Resolved schema for {}",
        location
    );

    let batch = match schema.amount {
        AmountType::Integer => TransactionBatch::Integer(
            cells
                .iter()
                .map(|(line, row)| convert(&schema, *line, row, parse_integer_amount))
                .collect(),
        ),
        AmountType::Double => TransactionBatch::Double(
            cells
                .iter()
                .map(|(line, row)| convert(&schema, *line, row, parse_double_amount))
                .collect(),
        ),
    };

    Ok(ParsedCsv { schema, batch })
}

fn column_index(header: &[String], name: &str, location: &str) -> Result<usize> {
    header.iter().position(|column| column == name).ok_or_else(|| {
        Error::source_unavailable(
            location,
            format!(
                "column '{name}' not found (available: {})",
                if header.is_empty() {
                    "none".to_string()
                } else {
                    header.join(", ")
                }
            ),
        )
    })
}

fn convert<A>(
    schema: &Schema,
    line: u64,
    row: &[Option<&str>; 3],
    parse_amount: fn(Option<&str>) -> std::result::Result<A, InvalidRecordError>,
) -> RecordResult<A> {
    read_transaction(schema, row, parse_amount).map_err(|invalid| invalid.at_line(line))
}

fn read_transaction<A>(
    schema: &Schema,
    row: &[Option<&str>; 3],
    parse_amount: fn(Option<&str>) -> std::result::Result<A, InvalidRecordError>,
) -> RecordResult<A> {
    Ok(Transaction {
        user_id: parse_id(row[0], Field::UserId, schema.user_id)?,
        counterparty_id: parse_id(row[1], Field::CounterpartyId, schema.counterparty_id)?,
        amount: parse_amount(row[2])?,
    })
}
