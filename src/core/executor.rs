//! Query executor
//!
//! [`Executor`] runs commands through any [`Connection`] in one of four
//! modes (scalar, non-query, tabular, streaming). Every mode follows the
//! same sequence:
//!
//! 1. interceptors are asked whether to proceed; a cancel returns the mode's
//!    empty result without touching the connection;
//! 2. the connection is opened if needed and the driver call is timed;
//! 3. interceptors receive the timing and [`Outcome`], or the error, which is
//!    then returned unchanged.
//!
//! Scalar and non-query calls close a connection they opened before
//! returning. Tabular and streaming calls hand that job to the cursor.

use super::command::Command;
use super::config::ExecutorConfig;
use super::driver::Connection;
use super::error::{DatabaseError, Result};
use super::interceptor::{
    Decision, ExecutionFailed, ExecutionKind, Executed, Executing, Interceptor,
    LoggingInterceptor, Outcome,
};
use super::lifecycle::{open_for_cursor, ConnectionScope};
use super::mapper::{self, DataObject};
use super::record::DataTable;
use super::stream::RecordStream;
use super::value::DatabaseValue;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

/// Handle returned by [`Executor::add_interceptor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorId(u64);

/// Executes commands and notifies interceptors
pub struct Executor {
    config: ExecutorConfig,
    interceptors: Vec<(InterceptorId, Box<dyn Interceptor>)>,
    next_id: u64,
}

impl Executor {
    /// Create an executor with the default configuration
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    /// Create an executor from a configuration
    ///
    /// Registers a [`LoggingInterceptor`] first when logging is enabled.
    pub fn with_config(config: ExecutorConfig) -> Self {
        let mut executor = Self {
            config,
            interceptors: Vec::new(),
            next_id: 0,
        };
        if executor.config.logging.enabled {
            let logging = LoggingInterceptor::new(executor.config.logging.clone());
            executor.add_interceptor(logging);
        }
        executor
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Register an interceptor; it runs after those registered earlier
    pub fn add_interceptor(&mut self, interceptor: impl Interceptor + 'static) -> InterceptorId {
        let id = InterceptorId(self.next_id);
        self.next_id += 1;
        self.interceptors.push((id, Box::new(interceptor)));
        id
    }

    /// Unregister an interceptor; returns whether it was registered
    pub fn remove_interceptor(&mut self, id: InterceptorId) -> bool {
        let before = self.interceptors.len();
        self.interceptors.retain(|(registered, _)| *registered != id);
        self.interceptors.len() != before
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// Build a command, binding `values` to its placeholders in order
    ///
    /// # Errors
    ///
    /// [`DatabaseError::ParameterCountMismatch`] when the counts differ.
    pub fn build_command(&self, sql: &str, values: &[DatabaseValue]) -> Result<Command> {
        Command::build(sql, values, &self.config.bind)
    }

    /// Copy fields of `object` into the command's parameters by name
    pub fn copy_fields_into_parameters<T: DataObject>(&self, command: &mut Command, object: &T) {
        mapper::copy_fields_into_parameters(command, object, &self.config.bind);
    }

    /// Execute a query and return its single value
    pub fn execute_scalar<C: Connection>(
        &self,
        connection: &mut C,
        sql: &str,
        values: &[DatabaseValue],
    ) -> Result<DatabaseValue> {
        let command = self.build_command(sql, values)?;
        self.execute_scalar_command(connection, &command)
    }

    /// Execute a bound command and return its single value
    ///
    /// Returns [`DatabaseValue::Null`] if an interceptor cancels the call.
    pub fn execute_scalar_command<C: Connection>(
        &self,
        connection: &mut C,
        command: &Command,
    ) -> Result<DatabaseValue> {
        let kind = ExecutionKind::Scalar;
        command.validate()?;
        if self.before_execute(command, kind) == Decision::Cancel {
            return Ok(DatabaseValue::Null);
        }

        let started = Instant::now();
        match run_scoped(connection, |conn| conn.execute_scalar(command)) {
            Ok(value) => {
                let outcome = Outcome::Scalar {
                    was_null: value.is_null(),
                };
                self.after_execute(command, kind, started.elapsed(), outcome);
                Ok(value)
            }
            Err(err) => {
                self.on_error(command, kind, started.elapsed(), &err);
                Err(err)
            }
        }
    }

    /// Execute a statement and return the affected row count
    pub fn execute_non_query<C: Connection>(
        &self,
        connection: &mut C,
        sql: &str,
        values: &[DatabaseValue],
    ) -> Result<u64> {
        let command = self.build_command(sql, values)?;
        self.execute_non_query_command(connection, &command)
    }

    /// Execute a bound statement and return the affected row count
    ///
    /// Returns `0` if an interceptor cancels the call.
    pub fn execute_non_query_command<C: Connection>(
        &self,
        connection: &mut C,
        command: &Command,
    ) -> Result<u64> {
        let kind = ExecutionKind::NonQuery;
        command.validate()?;
        if self.before_execute(command, kind) == Decision::Cancel {
            return Ok(0);
        }

        let started = Instant::now();
        match run_scoped(connection, |conn| conn.execute_non_query(command)) {
            Ok(affected) => {
                self.after_execute(command, kind, started.elapsed(), Outcome::Affected(affected));
                Ok(affected)
            }
            Err(err) => {
                self.on_error(command, kind, started.elapsed(), &err);
                Err(err)
            }
        }
    }

    /// Execute a query and buffer every row
    pub fn get_table<C: Connection>(
        &self,
        connection: &mut C,
        sql: &str,
        values: &[DatabaseValue],
    ) -> Result<DataTable> {
        let command = self.build_command(sql, values)?;
        self.get_table_command(connection, &command)
    }

    /// Execute a bound query and buffer every row
    ///
    /// Returns an empty table if an interceptor cancels the call.
    pub fn get_table_command<C: Connection>(
        &self,
        connection: &mut C,
        command: &Command,
    ) -> Result<DataTable> {
        let mut table = DataTable::new();
        self.fill_table(connection, command, &mut table)?;
        Ok(table)
    }

    /// Append the rows of a bound query to `table`
    ///
    /// Returns the number of rows in `table` after loading, `0` if cancelled.
    pub fn fill_table<C: Connection>(
        &self,
        connection: &mut C,
        command: &Command,
        table: &mut DataTable,
    ) -> Result<usize> {
        let kind = ExecutionKind::Tabular;
        command.validate()?;
        if self.before_execute(command, kind) == Decision::Cancel {
            return Ok(0);
        }

        let started = Instant::now();
        match load_rows(connection, command, table) {
            Ok(()) => {
                let total = table.len();
                self.after_execute(command, kind, started.elapsed(), Outcome::Rows(total as u64));
                Ok(total)
            }
            Err(err) => {
                self.on_error(command, kind, started.elapsed(), &err);
                Err(err)
            }
        }
    }

    /// Execute a query and stream its rows lazily
    pub fn execute_records<'c, C: Connection>(
        &self,
        connection: &'c mut C,
        sql: &str,
        values: &[DatabaseValue],
    ) -> Result<RecordStream<C::Cursor<'c>>> {
        let command = self.build_command(sql, values)?;
        self.execute_records_command(connection, &command)
    }

    /// Execute a bound query and stream its rows lazily
    ///
    /// A connection that was closed on entry is closed when the stream
    /// releases its cursor: after the last row, on [`RecordStream::close`],
    /// or when the stream is dropped. A stream kept alive without being
    /// drained keeps the connection open. If the driver fails to produce a
    /// cursor, a connection opened by this call stays open.
    ///
    /// Returns an empty stream if an interceptor cancels the call.
    pub fn execute_records_command<'c, C: Connection>(
        &self,
        connection: &'c mut C,
        command: &Command,
    ) -> Result<RecordStream<C::Cursor<'c>>> {
        let kind = ExecutionKind::Streaming;
        command.validate()?;
        if self.before_execute(command, kind) == Decision::Cancel {
            return Ok(RecordStream::empty());
        }

        let started = Instant::now();
        let opened = match open_for_cursor(connection) {
            Ok(behavior) => connection.execute_cursor(command, behavior),
            Err(err) => Err(err),
        };
        match opened {
            Ok(cursor) => {
                self.after_execute(command, kind, started.elapsed(), Outcome::Streaming);
                Ok(RecordStream::new(cursor))
            }
            Err(err) => {
                self.on_error(command, kind, started.elapsed(), &err);
                Err(err)
            }
        }
    }

    fn before_execute(&self, command: &Command, kind: ExecutionKind) -> Decision {
        let event = Executing { command, kind };
        for (_, interceptor) in &self.interceptors {
            if interceptor.before_execute(&event) == Decision::Cancel {
                debug!(kind = %kind, sql = command.text(), "Execution cancelled by interceptor");
                return Decision::Cancel;
            }
        }
        Decision::Proceed
    }

    fn after_execute(&self, command: &Command, kind: ExecutionKind, elapsed: Duration, outcome: Outcome) {
        let event = Executed {
            command,
            kind,
            elapsed,
            outcome,
        };
        for (_, interceptor) in &self.interceptors {
            interceptor.after_execute(&event);
        }
    }

    fn on_error(
        &self,
        command: &Command,
        kind: ExecutionKind,
        elapsed: Duration,
        error: &DatabaseError,
    ) {
        let event = ExecutionFailed {
            command,
            kind,
            elapsed,
            error,
        };
        for (_, interceptor) in &self.interceptors {
            interceptor.on_error(&event);
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// Run a driver call with the connection opened and restored around it
fn run_scoped<C: Connection, T>(
    connection: &mut C,
    call: impl FnOnce(&mut C) -> Result<T>,
) -> Result<T> {
    let mut scope = ConnectionScope::enter(connection)?;
    let value = call(scope.connection())?;
    scope.exit()?;
    Ok(value)
}

fn load_rows<C: Connection>(connection: &mut C, command: &Command, table: &mut DataTable) -> Result<()> {
    let behavior = open_for_cursor(connection)?;
    let cursor = connection.execute_cursor(command, behavior)?;
    let mut stream = RecordStream::new(cursor);
    table.set_columns(stream.columns());
    for record in stream.by_ref() {
        table.push(record?);
    }
    stream.close()
}
