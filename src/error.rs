use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Record source unavailable ({location}): {reason}")]
    SourceUnavailable { location: String, reason: String },

    #[error(transparent)]
    InvalidRecord(#[from] InvalidRecordError),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Formatting error: {0}")]
    Format(#[from] fmt::Error),

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Aggregation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn source_unavailable(location: impl Into<String>, reason: impl fmt::Display) -> Self {
        Error::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit code for the harness, following sysexits(3).
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::SourceUnavailable { .. } => 66,
            Error::InvalidRecord(_) | Error::Arithmetic(_) => 65,
            Error::Config(_) | Error::Toml(_) => 78,
            _ => 1,
        }
    }
}

/// The transaction field an [`InvalidRecordError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    UserId,
    CounterpartyId,
    Amount,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::UserId => write!(f, "user_id"),
            Field::CounterpartyId => write!(f, "counterparty_id"),
            Field::Amount => write!(f, "amount"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidKind {
    /// The cell was absent or empty.
    Missing,
    /// The cell holds a value that does not fit the column type.
    Unparseable { value: String, expected: &'static str },
}

/// A record that cannot be turned into a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct InvalidRecordError {
    /// 1-based line in the source, when the source has lines.
    pub line: Option<u64>,
    pub field: Field,
    pub kind: InvalidKind,
}

impl InvalidRecordError {
    pub fn missing(field: Field) -> Self {
        Self {
            line: None,
            field,
            kind: InvalidKind::Missing,
        }
    }

    pub fn unparseable(field: Field, value: impl Into<String>, expected: &'static str) -> Self {
        Self {
            line: None,
            field,
            kind: InvalidKind::Unparseable {
                value: value.into(),
                expected,
            },
        }
    }

    pub fn at_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for InvalidRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid record")?;
        if let Some(line) = self.line {
            write!(f, " at line {line}")?;
        }
        match &self.kind {
            InvalidKind::Missing => write!(f, ": {} is missing", self.field),
            InvalidKind::Unparseable { value, expected } => {
                write!(f, ": {} value {value:?} is not a valid {expected}", self.field)
            }
        }
    }
}

/// Summation left the representable range of the amount type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Arithmetic overflow: total for ({user_id}, {counterparty_id}) exceeds the range of {amount_type}")]
pub struct ArithmeticError {
    pub user_id: String,
    pub counterparty_id: String,
    pub amount_type: &'static str,
}

pub type Result<T> = std::result::Result<T, Error>;
