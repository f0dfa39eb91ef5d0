//! Driver contract
//!
//! This module defines the traits a database driver implements so the
//! executor can run commands against it. The layer never creates or destroys
//! connections; it only inspects and transitions their open/closed state.

use super::command::Command;
use super::error::Result;
use super::value::DatabaseValue;

/// Open/closed state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Closed,
    Open,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// What closing a cursor does to its connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorBehavior {
    /// Leave the connection as it is
    #[default]
    Default,
    /// Close the connection together with the cursor
    CloseConnection,
}

/// A driver connection
///
/// Implementations are synchronous: every method blocks until the driver
/// answers. A connection must not be used by two operations at once; the
/// `&mut self` receivers enforce this.
pub trait Connection {
    /// Forward-only cursor borrowing this connection
    type Cursor<'c>: Cursor
    where
        Self: 'c;

    /// Current open/closed state
    fn state(&self) -> ConnectionState;

    /// Open the connection
    fn open(&mut self) -> Result<()>;

    /// Close the connection
    fn close(&mut self) -> Result<()>;

    /// Execute a statement and return the number of affected rows
    ///
    /// A statement that returns rows is run to completion and its rows are
    /// discarded; a read-only one reports `0`.
    fn execute_non_query(&mut self, command: &Command) -> Result<u64>;

    /// Execute a query and return the first column of the first row
    ///
    /// Returns [`DatabaseValue::Null`] when the query yields no rows.
    fn execute_scalar(&mut self, command: &Command) -> Result<DatabaseValue>;

    /// Execute a query and return a cursor over its rows
    fn execute_cursor(
        &mut self,
        command: &Command,
        behavior: CursorBehavior,
    ) -> Result<Self::Cursor<'_>>;
}

/// A forward-only result cursor
pub trait Cursor {
    /// Column names of the result, in order
    fn columns(&self) -> &[String];

    /// Advance one row; `None` once the result is exhausted
    fn read(&mut self) -> Result<Option<Vec<DatabaseValue>>>;

    /// Release the cursor
    ///
    /// With [`CursorBehavior::CloseConnection`] this also closes the
    /// connection. Reading after close fails with
    /// [`DatabaseError::CursorClosed`](super::error::DatabaseError::CursorClosed).
    fn close(&mut self) -> Result<()>;
}
