//! Run configuration.
//!
//! Values are layered: built-in defaults, then the TOML config file, then
//! `COUNTERPARTY_MAX_*` environment variables, then command line flags
//! (applied by the binary).

use crate::aggregation::formatter::DEFAULT_MAX_ROWS;
use crate::aggregation::{FormatType, OutputFormatter};
use crate::context::{
    ExecutionSettings, InvalidRecordPolicy, DEFAULT_APP_NAME, DEFAULT_SHUFFLE_PARTITIONS,
};
use crate::error::{Error, Result};
use crate::source::{ColumnNames, CsvOptions, DeclaredSchema};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

pub mod loader;

pub use loader::ConfigLoader;

pub const ENV_PREFIX: &str = "COUNTERPARTY_MAX_";
pub const CONFIG_FILE_NAME: &str = "counterparty-max.toml";
pub const DEFAULT_INPUT_PATH: &str = "data/Transaction.csv";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app_name: String,
    pub log_level: Option<String>,
    pub input: InputConfig,
    pub execution: ExecutionConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: PathBuf,
    pub has_header: bool,
    pub delimiter: char,
    pub columns: ColumnNames,
    pub schema: DeclaredSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub shuffle_partitions: usize,
    pub worker_threads: Option<usize>,
    pub on_invalid_record: InvalidRecordPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: FormatType,
    pub max_rows: usize,
    pub truncate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            log_level: Some("info".to_string()),
            input: InputConfig::default(),
            execution: ExecutionConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_INPUT_PATH),
            has_header: true,
            delimiter: ',',
            columns: ColumnNames::default(),
            schema: DeclaredSchema::default(),
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            shuffle_partitions: DEFAULT_SHUFFLE_PARTITIONS,
            worker_threads: None,
            on_invalid_record: InvalidRecordPolicy::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: FormatType::default(),
            max_rows: DEFAULT_MAX_ROWS,
            truncate: true,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(path) = var("INPUT") {
            self.input.path = PathBuf::from(path);
        }

        if let Some(log_level) = var("LOG_LEVEL") {
            self.log_level = Some(log_level);
        }

        if let Some(partitions) = var("SHUFFLE_PARTITIONS") {
            self.execution.shuffle_partitions = parse_env("SHUFFLE_PARTITIONS", &partitions)?;
        }

        if let Some(threads) = var("WORKER_THREADS") {
            self.execution.worker_threads = Some(parse_env("WORKER_THREADS", &threads)?);
        }

        if let Some(policy) = var("ON_INVALID_RECORD") {
            self.execution.on_invalid_record = parse_env("ON_INVALID_RECORD", &policy)?;
        }

        if let Some(format) = var("FORMAT") {
            self.output.format = parse_env("FORMAT", &format)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(Error::Config("app_name must not be empty".to_string()));
        }
        if self.execution.shuffle_partitions == 0 {
            return Err(Error::Config(
                "execution.shuffle_partitions must be at least 1".to_string(),
            ));
        }
        if self.execution.worker_threads == Some(0) {
            return Err(Error::Config(
                "execution.worker_threads must be at least 1".to_string(),
            ));
        }
        self.delimiter_byte()?;
        let columns = &self.input.columns;
        for (key, name) in [
            ("user_id", &columns.user_id),
            ("counterparty_id", &columns.counterparty_id),
            ("amount", &columns.amount),
        ] {
            if name.trim().is_empty() {
                return Err(Error::Config(format!(
                    "input.columns.{key} must not be empty"
                )));
            }
        }
        self.input.schema.validate()
    }

    pub fn execution_settings(&self) -> ExecutionSettings {
        ExecutionSettings {
            app_name: self.app_name.clone(),
            shuffle_partitions: self.execution.shuffle_partitions,
            worker_threads: self.execution.worker_threads,
            invalid_records: self.execution.on_invalid_record,
        }
    }

    pub fn csv_options(&self) -> Result<CsvOptions> {
        Ok(CsvOptions {
            has_header: self.input.has_header,
            delimiter: self.delimiter_byte()?,
            columns: self.input.columns.clone(),
            schema: self.input.schema,
        })
    }

    fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.input.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                Error::Config(format!(
                    "input.delimiter must be a single ASCII character, got {:?}",
                    self.input.delimiter
                ))
            })
    }

    pub fn formatter(&self) -> OutputFormatter {
        OutputFormatter::new(self.output.format)
            .with_max_rows(self.output.max_rows)
            .with_truncate(self.output.truncate)
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        Error::Config(format!("invalid value for {ENV_PREFIX}{name}: {e}"))
    })
}

#[cfg(test)]
mod tests;
