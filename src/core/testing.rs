//! Scripted driver used by unit tests
//!
//! Every driver call is appended to a shared [`Trace`] so tests can assert on
//! open/close ordering and cursor release counts.

use super::command::Command;
use super::driver::{Connection, ConnectionState, Cursor, CursorBehavior};
use super::error::{DatabaseError, Result};
use super::value::DatabaseValue;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Open,
    Close,
    NonQuery(String),
    Scalar(String),
    Cursor(String, CursorBehavior),
    CursorClose,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Trace(Arc<Mutex<Vec<Call>>>);

impl Trace {
    fn push(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn opens(&self) -> usize {
        self.count(|c| matches!(c, Call::Open))
    }

    pub(crate) fn closes(&self) -> usize {
        self.count(|c| matches!(c, Call::Close))
    }

    pub(crate) fn cursor_closes(&self) -> usize {
        self.count(|c| matches!(c, Call::CursorClose))
    }

    /// Calls that reached the driver's execute entry points
    pub(crate) fn executions(&self) -> usize {
        self.count(|c| matches!(c, Call::NonQuery(_) | Call::Scalar(_) | Call::Cursor(..)))
    }
}

pub(crate) struct ScriptedConnection {
    trace: Trace,
    state: Arc<Mutex<ConnectionState>>,
    columns: Vec<String>,
    rows: Vec<Vec<DatabaseValue>>,
    scalar: DatabaseValue,
    affected: u64,
    fail_open: bool,
    fail_execute: bool,
    fail_read_after: Option<usize>,
}

impl ScriptedConnection {
    pub(crate) fn new(trace: &Trace, state: ConnectionState) -> Self {
        Self {
            trace: trace.clone(),
            state: Arc::new(Mutex::new(state)),
            columns: Vec::new(),
            rows: Vec::new(),
            scalar: DatabaseValue::Null,
            affected: 0,
            fail_open: false,
            fail_execute: false,
            fail_read_after: None,
        }
    }

    pub(crate) fn with_rows(mut self, columns: &[&str], rows: Vec<Vec<DatabaseValue>>) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self.rows = rows;
        self
    }

    pub(crate) fn with_scalar(mut self, value: DatabaseValue) -> Self {
        self.scalar = value;
        self
    }

    pub(crate) fn with_affected(mut self, affected: u64) -> Self {
        self.affected = affected;
        self
    }

    pub(crate) fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub(crate) fn failing_execute(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub(crate) fn failing_read_after(mut self, rows: usize) -> Self {
        self.fail_read_after = Some(rows);
        self
    }

    fn check_executable(&self) -> Result<()> {
        if !self.state.lock().is_open() {
            return Err(DatabaseError::driver("connection is closed"));
        }
        if self.fail_execute {
            return Err(DatabaseError::driver("ORA-00942: table or view does not exist"));
        }
        Ok(())
    }
}

impl Connection for ScriptedConnection {
    type Cursor<'c> = ScriptedCursor where Self: 'c;

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    fn open(&mut self) -> Result<()> {
        self.trace.push(Call::Open);
        if self.fail_open {
            return Err(DatabaseError::driver("listener refused the connection"));
        }
        *self.state.lock() = ConnectionState::Open;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.trace.push(Call::Close);
        *self.state.lock() = ConnectionState::Closed;
        Ok(())
    }

    fn execute_non_query(&mut self, command: &Command) -> Result<u64> {
        self.trace.push(Call::NonQuery(command.text().to_string()));
        self.check_executable()?;
        Ok(self.affected)
    }

    fn execute_scalar(&mut self, command: &Command) -> Result<DatabaseValue> {
        self.trace.push(Call::Scalar(command.text().to_string()));
        self.check_executable()?;
        Ok(self.scalar.clone())
    }

    fn execute_cursor(
        &mut self,
        command: &Command,
        behavior: CursorBehavior,
    ) -> Result<Self::Cursor<'_>> {
        self.trace
            .push(Call::Cursor(command.text().to_string(), behavior));
        self.check_executable()?;
        let columns: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let mut cursor = ScriptedCursor::new(&self.trace, &columns, self.rows.clone());
        cursor.fail_after = self.fail_read_after;
        if behavior == CursorBehavior::CloseConnection {
            cursor.connection = Some(Arc::clone(&self.state));
        }
        Ok(cursor)
    }
}

pub(crate) struct ScriptedCursor {
    trace: Trace,
    columns: Vec<String>,
    rows: VecDeque<Vec<DatabaseValue>>,
    read: usize,
    fail_after: Option<usize>,
    connection: Option<Arc<Mutex<ConnectionState>>>,
    closed: bool,
}

impl ScriptedCursor {
    pub(crate) fn new(trace: &Trace, columns: &[&str], rows: Vec<Vec<DatabaseValue>>) -> Self {
        Self {
            trace: trace.clone(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows.into(),
            read: 0,
            fail_after: None,
            connection: None,
            closed: false,
        }
    }

    pub(crate) fn fail_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }
}

impl Cursor for ScriptedCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn read(&mut self) -> Result<Option<Vec<DatabaseValue>>> {
        if self.closed {
            return Err(DatabaseError::CursorClosed);
        }
        if self.fail_after == Some(self.read) {
            return Err(DatabaseError::driver("network dropped mid-fetch"));
        }
        self.read += 1;
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.trace.push(Call::CursorClose);
        if let Some(state) = self.connection.take() {
            self.trace.push(Call::Close);
            *state.lock() = ConnectionState::Closed;
        }
        Ok(())
    }
}
