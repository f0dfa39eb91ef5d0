//! Execution interceptors
//!
//! Interceptors are registered on an [`Executor`](super::executor::Executor)
//! and called synchronously, in registration order, around every execution:
//!
//! 1. [`Interceptor::before_execute`] may return [`Decision::Cancel`] to skip
//!    the call; the operation then returns its empty result.
//! 2. [`Interceptor::after_execute`] receives timing and an [`Outcome`].
//! 3. [`Interceptor::on_error`] observes driver failures. It cannot suppress
//!    them; the error is still returned to the caller.

use super::command::Command;
use super::config::LoggingConfig;
use super::error::DatabaseError;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// The four execution modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ExecutionKind {
    Scalar,
    NonQuery,
    Tabular,
    Streaming,
}

impl ExecutionKind {
    pub fn to_str(&self) -> &'static str {
        match self {
            ExecutionKind::Scalar => "scalar",
            ExecutionKind::NonQuery => "non_query",
            ExecutionKind::Tabular => "tabular",
            ExecutionKind::Streaming => "streaming",
        }
    }
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

/// Answer of [`Interceptor::before_execute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decision {
    #[default]
    Proceed,
    Cancel,
}

/// What a completed execution produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Scalar query; whether the value was SQL NULL
    Scalar { was_null: bool },
    /// Rows affected by a non-query
    Affected(u64),
    /// Rows loaded into a table
    Rows(u64),
    /// Cursor opened; the row count is unknown until drained
    Streaming,
}

impl Outcome {
    /// Count reported for the execution
    ///
    /// For scalars this is `1` when the result was NULL and `0` otherwise,
    /// not a row count. Streaming has no count.
    pub fn count(&self) -> Option<u64> {
        match self {
            Outcome::Scalar { was_null } => Some(u64::from(*was_null)),
            Outcome::Affected(n) | Outcome::Rows(n) => Some(*n),
            Outcome::Streaming => None,
        }
    }
}

/// Raised before the driver is called
#[derive(Debug, Clone, Copy)]
pub struct Executing<'a> {
    pub command: &'a Command,
    pub kind: ExecutionKind,
}

/// Raised after the driver call succeeded
#[derive(Debug, Clone, Copy)]
pub struct Executed<'a> {
    pub command: &'a Command,
    pub kind: ExecutionKind,
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl Executed<'_> {
    pub fn count(&self) -> Option<u64> {
        self.outcome.count()
    }
}

/// Raised when the driver call failed
#[derive(Debug, Clone, Copy)]
pub struct ExecutionFailed<'a> {
    pub command: &'a Command,
    pub kind: ExecutionKind,
    pub elapsed: Duration,
    pub error: &'a DatabaseError,
}

/// Observer of executions
pub trait Interceptor: Send + Sync {
    fn before_execute(&self, _event: &Executing<'_>) -> Decision {
        Decision::Proceed
    }

    fn after_execute(&self, _event: &Executed<'_>) {}

    fn on_error(&self, _event: &ExecutionFailed<'_>) {}
}

impl<I: Interceptor + ?Sized> Interceptor for Arc<I> {
    fn before_execute(&self, event: &Executing<'_>) -> Decision {
        (**self).before_execute(event)
    }

    fn after_execute(&self, event: &Executed<'_>) {
        (**self).after_execute(event)
    }

    fn on_error(&self, event: &ExecutionFailed<'_>) {
        (**self).on_error(event)
    }
}

/// Logs every execution through `tracing`
#[derive(Debug, Clone, Default)]
pub struct LoggingInterceptor {
    config: LoggingConfig,
}

impl LoggingInterceptor {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    fn parameters(&self, command: &Command) -> String {
        if !self.config.log_parameters {
            return format!("<{} hidden>", command.parameters().len());
        }
        command
            .parameters()
            .iter()
            .map(|p| format!("{}={}", p.placeholder(), p.value().as_string()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Interceptor for LoggingInterceptor {
    fn before_execute(&self, event: &Executing<'_>) -> Decision {
        debug!(
            kind = %event.kind,
            sql = event.command.text(),
            params = %self.parameters(event.command),
            "Executing"
        );
        Decision::Proceed
    }

    fn after_execute(&self, event: &Executed<'_>) {
        let elapsed_ms = event.elapsed.as_millis() as u64;
        if event.elapsed >= self.config.slow_query_threshold() {
            warn!(
                kind = %event.kind,
                sql = event.command.text(),
                elapsed_ms,
                count = ?event.count(),
                "Slow statement"
            );
        } else {
            debug!(kind = %event.kind, elapsed_ms, count = ?event.count(), "Executed");
        }
    }

    fn on_error(&self, event: &ExecutionFailed<'_>) {
        error!(
            kind = %event.kind,
            sql = event.command.text(),
            params = %self.parameters(event.command),
            error = %event.error,
            "Execution failed"
        );
    }
}

/// Counters collected by [`MetricsInterceptor`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionStats {
    pub executed: u64,
    pub failed: u64,
    pub by_kind: BTreeMap<ExecutionKind, u64>,
    pub rows_loaded: u64,
    pub rows_affected: u64,
    pub total_elapsed: Duration,
    pub slowest: Duration,
}

/// Aggregates execution counts and timings
#[derive(Debug, Default)]
pub struct MetricsInterceptor {
    stats: Mutex<ExecutionStats>,
}

impl MetricsInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> ExecutionStats {
        self.stats.lock().clone()
    }

    pub fn reset(&self) {
        *self.stats.lock() = ExecutionStats::default();
    }
}

impl Interceptor for MetricsInterceptor {
    fn after_execute(&self, event: &Executed<'_>) {
        let mut stats = self.stats.lock();
        stats.executed += 1;
        *stats.by_kind.entry(event.kind).or_insert(0) += 1;
        match event.outcome {
            Outcome::Rows(n) => stats.rows_loaded += n,
            Outcome::Affected(n) => stats.rows_affected += n,
            Outcome::Scalar { .. } | Outcome::Streaming => {}
        }
        stats.total_elapsed += event.elapsed;
        if event.elapsed > stats.slowest {
            stats.slowest = event.elapsed;
        }
    }

    fn on_error(&self, event: &ExecutionFailed<'_>) {
        let mut stats = self.stats.lock();
        stats.failed += 1;
        stats.total_elapsed += event.elapsed;
    }
}
