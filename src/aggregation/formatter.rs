//! Output formatting for aggregation results
//!
//! Renders result rows as a console table (the layout of a Spark
//! `DataFrame.show()`), JSON, CSV or Markdown.

use super::amount::Amount;
use super::Aggregation;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::{self, Display, Write};
use std::str::FromStr;

const COLUMNS: [&str; 3] = ["user_id", "counterparty_id", "total_amount"];
const TRUNCATE_AT: usize = 20;
pub const DEFAULT_MAX_ROWS: usize = 20;

/// Format type for output presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatType {
    /// Bordered console table
    #[default]
    Table,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// CSV with a header row
    Csv,
    /// Markdown table
    Markdown,
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormatType::Table => "table",
            FormatType::Json => "json",
            FormatType::JsonPretty => "json-pretty",
            FormatType::Csv => "csv",
            FormatType::Markdown => "markdown",
        };
        f.write_str(name)
    }
}

impl FromStr for FormatType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(FormatType::Table),
            "json" => Ok(FormatType::Json),
            "json-pretty" | "pretty" => Ok(FormatType::JsonPretty),
            "csv" => Ok(FormatType::Csv),
            "markdown" | "md" => Ok(FormatType::Markdown),
            other => Err(format!(
                "unknown output format '{other}' (expected table, json, json-pretty, csv or markdown)"
            )),
        }
    }
}

/// Output formatter for aggregation results
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    format_type: FormatType,
    max_rows: usize,
    truncate: bool,
}

impl OutputFormatter {
    /// Create a new formatter with the specified format type
    pub fn new(format_type: FormatType) -> Self {
        Self {
            format_type,
            max_rows: DEFAULT_MAX_ROWS,
            truncate: true,
        }
    }

    /// Limit the rows shown by the table format
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Shorten long table cells and right-align them
    pub fn with_truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    pub fn format_type(&self) -> FormatType {
        self.format_type
    }

    /// Format results according to the configured format type
    pub fn format<K, A>(&self, aggregation: &Aggregation<K, A>) -> Result<String>
    where
        K: Display + Serialize,
        A: Amount,
    {
        match self.format_type {
            FormatType::Table => Ok(self.format_table(aggregation)?),
            FormatType::Json => Ok(serde_json::to_string(&json_document(aggregation))?),
            FormatType::JsonPretty => Ok(serde_json::to_string_pretty(&json_document(aggregation))?),
            FormatType::Csv => format_csv(aggregation),
            FormatType::Markdown => Ok(format_markdown(aggregation)?),
        }
    }

    fn format_table<K, A>(&self, aggregation: &Aggregation<K, A>) -> std::result::Result<String, fmt::Error>
    where
        K: Display,
        A: Amount,
    {
        let shown = aggregation.rows.len().min(self.max_rows);
        let cells: Vec<[String; 3]> = aggregation.rows[..shown]
            .iter()
            .map(|row| {
                [
                    self.cell(row.user_id.to_string()),
                    self.cell(row.counterparty_id.to_string()),
                    self.cell(row.total_amount.render()),
                ]
            })
            .collect();

        let mut widths = COLUMNS.map(|name| name.chars().count().max(3));
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let separator = widths
            .iter()
            .fold(String::from("+"), |mut line, width| {
                line.push_str(&"-".repeat(*width));
                line.push('+');
                line
            });

        let mut output = String::new();
        writeln!(&mut output, "{separator}")?;
        self.write_table_row(&mut output, &COLUMNS.map(str::to_string), &widths)?;
        writeln!(&mut output, "{separator}")?;
        for row in &cells {
            self.write_table_row(&mut output, row, &widths)?;
        }
        writeln!(&mut output, "{separator}")?;

        if shown < aggregation.rows.len() {
            let noun = if shown == 1 { "row" } else { "rows" };
            writeln!(&mut output, "only showing top {shown} {noun}")?;
        }

        Ok(output)
    }

    fn write_table_row(
        &self,
        output: &mut String,
        row: &[String; 3],
        widths: &[usize; 3],
    ) -> fmt::Result {
        output.push('|');
        for (cell, width) in row.iter().zip(widths) {
            if self.truncate {
                write!(output, "{cell:>width$}|")?;
            } else {
                write!(output, "{cell:<width$}|")?;
            }
        }
        output.push('\n');
        Ok(())
    }

    fn cell(&self, text: String) -> String {
        if self.truncate && text.chars().count() > TRUNCATE_AT {
            let kept: String = text.chars().take(TRUNCATE_AT - 3).collect();
            format!("{kept}...")
        } else {
            text
        }
    }
}

fn json_document<K, A>(aggregation: &Aggregation<K, A>) -> serde_json::Value
where
    K: Serialize,
    A: Amount,
{
    json!({
        "rows": aggregation.rows,
        "summary": aggregation.summary,
    })
}

fn format_csv<K, A>(aggregation: &Aggregation<K, A>) -> Result<String>
where
    K: Display,
    A: Amount,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(COLUMNS)
        .map_err(std::io::Error::from)?;
    for row in &aggregation.rows {
        writer
            .write_record([
                row.user_id.to_string(),
                row.counterparty_id.to_string(),
                row.total_amount.render(),
            ])
            .map_err(std::io::Error::from)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let output = String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(output)
}

fn format_markdown<K, A>(aggregation: &Aggregation<K, A>) -> std::result::Result<String, fmt::Error>
where
    K: Display,
    A: Amount,
{
    let mut output = String::new();

    writeln!(&mut output, "| user_id | counterparty_id | total_amount |")?;
    writeln!(&mut output, "|---------|-----------------|--------------|")?;
    for row in &aggregation.rows {
        writeln!(
            &mut output,
            "| {} | {} | {} |",
            markdown_cell(&row.user_id),
            markdown_cell(&row.counterparty_id),
            row.total_amount.render()
        )?;
    }

    Ok(output)
}

fn markdown_cell(value: &impl Display) -> String {
    value.to_string().replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::AggregationSummary;
    use crate::types::{PartyId, ResultRow};

    fn aggregation<A: Amount>(rows: Vec<(&str, &str, A)>) -> Aggregation<PartyId, A> {
        let rows: Vec<_> = rows
            .into_iter()
            .map(|(u, c, a)| ResultRow {
                user_id: PartyId::from(u),
                counterparty_id: PartyId::from(c),
                total_amount: a,
            })
            .collect();
        Aggregation {
            summary: AggregationSummary {
                records_read: rows.len(),
                rows: rows.len(),
                ..Default::default()
            },
            rows,
            skipped: vec![],
        }
    }

    #[test]
    fn test_table_format() {
        let results = aggregation(vec![("u1", "c1", 80i64), ("u1", "c2", 80)]);
        let output = OutputFormatter::new(FormatType::Table)
            .format(&results)
            .unwrap();

        let expected = "\
+-------+---------------+------------+
|user_id|counterparty_id|total_amount|
+-------+---------------+------------+
|     u1|             c1|          80|
|     u1|             c2|          80|
+-------+---------------+------------+
";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_table_format_limits_rows() {
        let results = aggregation(vec![("u1", "c1", 1.0f64), ("u2", "c1", 2.5), ("u3", "c1", 3.0)]);
        let output = OutputFormatter::new(FormatType::Table)
            .with_max_rows(1)
            .format(&results)
            .unwrap();

        assert!(output.contains("|     u1|             c1|         1.0|"));
        assert!(!output.contains("u2"));
        assert!(output.ends_with("only showing top 1 row\n"));
    }

    #[test]
    fn test_table_truncates_long_cells() {
        let long_id = "counterparty-with-a-long-name";
        let results = aggregation(vec![("u1", long_id, 5i64)]);

        let truncated = OutputFormatter::new(FormatType::Table)
            .format(&results)
            .unwrap();
        assert!(truncated.contains("counterparty-with..."));
        assert!(!truncated.contains(long_id));

        let full = OutputFormatter::new(FormatType::Table)
            .with_truncate(false)
            .format(&results)
            .unwrap();
        assert!(full.contains(&format!("|u1     |{long_id}|5           |")));
    }

    #[test]
    fn test_empty_table_keeps_header() {
        let results = aggregation::<i64>(vec![]);
        let output = OutputFormatter::new(FormatType::Table)
            .format(&results)
            .unwrap();
        assert_eq!(output.lines().count(), 4);
        assert!(!output.contains("only showing"));
    }

    #[test]
    fn test_json_format() {
        let results = aggregation(vec![("u1", "c1", 80i64)]);
        let output = OutputFormatter::new(FormatType::Json)
            .format(&results)
            .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(
            parsed,
            json!({
                "rows": [{"user_id": "u1", "counterparty_id": "c1", "total_amount": 80}],
                "summary": {
                    "records_read": 1,
                    "records_skipped": 0,
                    "pairs": 0,
                    "users": 0,
                    "rows": 1
                }
            })
        );
    }

    #[test]
    fn test_csv_format() {
        let results = aggregation(vec![("u1", "c,1", 80.0f64), ("u2", "c3", 5.5)]);
        let output = OutputFormatter::new(FormatType::Csv)
            .format(&results)
            .unwrap();

        assert_eq!(
            output,
            "user_id,counterparty_id,total_amount\nu1,\"c,1\",80.0\nu2,c3,5.5\n"
        );
    }

    #[test]
    fn test_markdown_format() {
        let results = aggregation(vec![("u1", "c1", 3i64)]);
        let output = OutputFormatter::new(FormatType::Markdown)
            .format(&results)
            .unwrap();
        assert!(output.starts_with("| user_id | counterparty_id | total_amount |"));
        assert!(output.contains("| u1 | c1 | 3 |"));
    }

    #[test]
    fn test_markdown_escapes_pipes_in_ids() {
        let results = aggregation(vec![("u|1", "c1", 3i64)]);
        let output = OutputFormatter::new(FormatType::Markdown)
            .format(&results)
            .unwrap();
        assert!(output.contains(r"| u\|1 | c1 | 3 |"));
    }

    #[test]
    fn test_format_type_parsing() {
        assert_eq!("JSON".parse::<FormatType>(), Ok(FormatType::Json));
        assert_eq!("md".parse::<FormatType>(), Ok(FormatType::Markdown));
        assert_eq!(FormatType::JsonPretty.to_string(), "json-pretty");
        assert!("xml".parse::<FormatType>().is_err());
    }
}
