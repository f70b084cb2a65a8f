//! Caller-owned execution context.
//!
//! A context bundles the run settings with the worker pool that partitioned
//! aggregation runs on. Contexts are independent of each other, so tests and
//! embedders can hold several at once.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_APP_NAME: &str = "CounterpartyMaxAmount";
pub const DEFAULT_SHUFFLE_PARTITIONS: usize = 4;

/// What to do with a record that cannot become a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRecordPolicy {
    /// Fail the run on the first invalid record.
    #[default]
    Abort,
    /// Drop invalid records and report how many were dropped.
    Skip,
}

impl fmt::Display for InvalidRecordPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidRecordPolicy::Abort => write!(f, "abort"),
            InvalidRecordPolicy::Skip => write!(f, "skip"),
        }
    }
}

impl FromStr for InvalidRecordPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(InvalidRecordPolicy::Abort),
            "skip" => Ok(InvalidRecordPolicy::Skip),
            other => Err(format!(
                "unknown invalid record policy '{other}' (expected 'abort' or 'skip')"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSettings {
    pub app_name: String,
    /// Number of partitions the input is split into before summing.
    pub shuffle_partitions: usize,
    /// Worker threads in the pool; `None` lets rayon pick.
    pub worker_threads: Option<usize>,
    pub invalid_records: InvalidRecordPolicy,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            shuffle_partitions: DEFAULT_SHUFFLE_PARTITIONS,
            worker_threads: None,
            invalid_records: InvalidRecordPolicy::default(),
        }
    }
}

#[derive(Clone)]
pub struct ExecutionContext {
    settings: ExecutionSettings,
    pool: Arc<rayon::ThreadPool>,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("settings", &self.settings)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl ExecutionContext {
    pub fn new(settings: ExecutionSettings) -> Result<Self> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = settings.worker_threads {
            builder = builder.num_threads(threads);
        }
        let app_name = settings.app_name.clone();
        let pool = builder
            .thread_name(move |index| format!("{app_name}-worker-{index}"))
            .build()?;

        debug!(
            app_name = %settings.app_name,
            shuffle_partitions = settings.shuffle_partitions,
            threads = pool.current_num_threads(),
            "Created execution context"
        );

        Ok(Self {
            settings,
            pool: Arc::new(pool),
        })
    }

    pub fn builder() -> ExecutionContextBuilder {
        ExecutionContextBuilder::default()
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    pub fn app_name(&self) -> &str {
        &self.settings.app_name
    }

    /// Effective partition count, never below one.
    pub fn shuffle_partitions(&self) -> usize {
        self.settings.shuffle_partitions.max(1)
    }

    pub fn invalid_records(&self) -> InvalidRecordPolicy {
        self.settings.invalid_records
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside this context's worker pool.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }
}

#[derive(Debug, Default)]
pub struct ExecutionContextBuilder {
    settings: ExecutionSettings,
}

impl ExecutionContextBuilder {
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.settings.app_name = name.into();
        self
    }

    pub fn shuffle_partitions(mut self, partitions: usize) -> Self {
        self.settings.shuffle_partitions = partitions;
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.settings.worker_threads = Some(threads);
        self
    }

    pub fn invalid_records(mut self, policy: InvalidRecordPolicy) -> Self {
        self.settings.invalid_records = policy;
        self
    }

    pub fn build(self) -> Result<ExecutionContext> {
        ExecutionContext::new(self.settings)
    }
}
