//! Column typing for tabular record sources.
//!
//! Types are either declared in configuration or inferred from the cells,
//! the same way a Spark CSV read with `inferSchema` would settle them.

use crate::error::{Error, Field, InvalidRecordError, Result};
use crate::types::PartyId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column type as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Infer,
    Integer,
    Double,
    String,
}

/// Resolved type of an identifier column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdType {
    Integer,
    String,
}

/// Resolved type of the amount column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountType {
    Integer,
    Double,
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdType::Integer => write!(f, "integer"),
            IdType::String => write!(f, "string"),
        }
    }
}

impl fmt::Display for AmountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountType::Integer => write!(f, "integer"),
            AmountType::Double => write!(f, "double"),
        }
    }
}

/// Names of the three columns a transaction is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub user_id: String,
    pub counterparty_id: String,
    pub amount: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            user_id: "user_id".to_string(),
            counterparty_id: "counterparty_id".to_string(),
            amount: "amount".to_string(),
        }
    }
}

/// Column types as declared by the user; `infer` leaves the choice to the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclaredSchema {
    pub user_id: ColumnType,
    pub counterparty_id: ColumnType,
    pub amount: ColumnType,
}

impl DeclaredSchema {
    pub fn validate(&self) -> Result<()> {
        for (field, declared) in [
            (Field::UserId, self.user_id),
            (Field::CounterpartyId, self.counterparty_id),
        ] {
            if declared == ColumnType::Double {
                return Err(Error::Config(format!(
                    "{field} cannot be declared as double; use integer or string"
                )));
            }
        }
        if self.amount == ColumnType::String {
            return Err(Error::Config(
                "amount cannot be declared as string; use integer or double".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fully resolved schema of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub columns: ColumnNames,
    pub user_id: IdType,
    pub counterparty_id: IdType,
    pub amount: AmountType,
}

impl Schema {
    /// Resolve declared types, inferring the undeclared ones from `rows`.
    ///
    /// Each row holds the user, counterparty and amount cells; `None` is a
    /// null cell.
    pub fn resolve(columns: ColumnNames, declared: &DeclaredSchema, rows: &[[Option<&str>; 3]]) -> Self {
        let user_id = match declared.user_id {
            ColumnType::Integer => IdType::Integer,
            ColumnType::String | ColumnType::Double => IdType::String,
            ColumnType::Infer => infer_id_type(rows.iter().map(|row| row[0])),
        };
        let counterparty_id = match declared.counterparty_id {
            ColumnType::Integer => IdType::Integer,
            ColumnType::String | ColumnType::Double => IdType::String,
            ColumnType::Infer => infer_id_type(rows.iter().map(|row| row[1])),
        };
        let amount = match declared.amount {
            ColumnType::Integer => AmountType::Integer,
            ColumnType::Double | ColumnType::String => AmountType::Double,
            ColumnType::Infer => infer_amount_type(rows.iter().map(|row| row[2])),
        };
        Self {
            columns,
            user_id,
            counterparty_id,
            amount,
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "root")?;
        writeln!(f, " |-- {}: {} (nullable = true)", self.columns.user_id, self.user_id)?;
        writeln!(
            f,
            " |-- {}: {} (nullable = true)",
            self.columns.counterparty_id, self.counterparty_id
        )?;
        writeln!(f, " |-- {}: {} (nullable = true)", self.columns.amount, self.amount)
    }
}

/// `integer` when every non-null cell is an `i64`, otherwise `string`.
pub fn infer_id_type<'a>(cells: impl IntoIterator<Item = Option<&'a str>>) -> IdType {
    if cells.into_iter().flatten().all(|cell| cell.parse::<i64>().is_ok()) {
        IdType::Integer
    } else {
        IdType::String
    }
}

/// `integer` when every non-null cell is an `i64`, otherwise `double`.
pub fn infer_amount_type<'a>(cells: impl IntoIterator<Item = Option<&'a str>>) -> AmountType {
    if cells.into_iter().flatten().all(|cell| cell.parse::<i64>().is_ok()) {
        AmountType::Integer
    } else {
        AmountType::Double
    }
}

/// Read a required identifier cell.
pub fn parse_id(cell: Option<&str>, field: Field, id_type: IdType) -> std::result::Result<PartyId, InvalidRecordError> {
    let raw = cell.ok_or_else(|| InvalidRecordError::missing(field))?;
    match id_type {
        IdType::String => Ok(PartyId::Text(raw.to_string())),
        IdType::Integer => raw
            .parse()
            .map(PartyId::Integer)
            .map_err(|_| InvalidRecordError::unparseable(field, raw, "integer")),
    }
}

pub fn parse_integer_amount(cell: Option<&str>) -> std::result::Result<i64, InvalidRecordError> {
    let raw = cell.ok_or_else(|| InvalidRecordError::missing(Field::Amount))?;
    raw.parse()
        .map_err(|_| InvalidRecordError::unparseable(Field::Amount, raw, "integer"))
}

/// Non-finite values (`NaN`, `inf`) are rejected.
pub fn parse_double_amount(cell: Option<&str>) -> std::result::Result<f64, InvalidRecordError> {
    let raw = cell.ok_or_else(|| InvalidRecordError::missing(Field::Amount))?;
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| InvalidRecordError::unparseable(Field::Amount, raw, "double"))
}
