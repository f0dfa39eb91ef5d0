//! SQLite driver
//!
//! This module implements the [`Connection`] and [`Cursor`] traits on top of
//! `rusqlite`. Closing the connection drops the underlying handle, so an
//! in-memory database does not survive a close; use a file path when the
//! executor is expected to open and close the connection around calls.
//!
//! A cursor takes the handle out of its [`SqliteConnection`] for as long as it
//! lives, together with the prepared statement and its row iterator, and
//! steps the statement once per read. Releasing the cursor hands the handle
//! back, or closes it when the cursor was created with
//! [`CursorBehavior::CloseConnection`].

use crate::core::command::Command;
use crate::core::driver::{Connection, ConnectionState, Cursor, CursorBehavior};
use crate::core::error::{DatabaseError, Result};
use crate::core::value::DatabaseValue;
use rusqlite::types::ValueRef;
use ouroboros::self_referencing;
use rusqlite::{Row, Rows, Statement, ToSql};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Text form used for date/time parameters
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Settings applied when a [`SqliteConnection`] opens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file path, or `:memory:`
    pub path: String,
    /// Run `PRAGMA foreign_keys = ON` after opening
    pub foreign_keys: bool,
    /// How long to wait on a locked database
    pub busy_timeout_ms: Option<u64>,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            foreign_keys: true,
            busy_timeout_ms: None,
        }
    }
}

/// SQLite connection; starts closed
pub struct SqliteConnection {
    config: SqliteConfig,
    connection: Option<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Create a closed connection to the database at `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self::from_config(SqliteConfig {
            path: path.into(),
            ..SqliteConfig::default()
        })
    }

    pub fn from_config(config: SqliteConfig) -> Self {
        Self {
            config,
            connection: None,
        }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    fn handle(&self) -> Result<&rusqlite::Connection> {
        self.connection.as_ref().ok_or_else(Self::not_open)
    }

    fn not_open() -> DatabaseError {
        DatabaseError::driver("SQLite connection is not open")
    }

    /// Prepare `command` and bind its parameters by name
    ///
    /// Every named slot SQLite reports is matched to a command parameter
    /// ignoring ASCII case; slots without a parameter stay NULL.
    fn prepare<'a>(handle: &'a rusqlite::Connection, command: &Command) -> Result<Statement<'a>> {
        let mut stmt = handle.prepare(command.text())?;
        for index in 1..=stmt.parameter_count() {
            let Some(slot) = stmt.parameter_name(index).map(str::to_owned) else {
                continue;
            };
            let name = slot.get(1..).unwrap_or_default();
            if let Some(parameter) = command.parameter(name) {
                stmt.raw_bind_parameter(index, Self::value_to_param(parameter.value()))?;
            }
        }
        Ok(stmt)
    }

    /// Convert a rusqlite row to positional values
    fn row_values(row: &Row<'_>, column_count: usize) -> rusqlite::Result<Vec<DatabaseValue>> {
        (0..column_count)
            .map(|i| row.get_ref(i).map(Self::value_from_ref))
            .collect()
    }

    fn value_from_ref(value: ValueRef<'_>) -> DatabaseValue {
        match value {
            ValueRef::Null => DatabaseValue::Null,
            ValueRef::Integer(v) => DatabaseValue::Long(v),
            ValueRef::Real(v) => DatabaseValue::Double(v),
            ValueRef::Text(v) => DatabaseValue::String(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => DatabaseValue::Bytes(v.to_vec()),
        }
    }

    /// Convert DatabaseValue to rusqlite parameter
    fn value_to_param(value: &DatabaseValue) -> Box<dyn ToSql> {
        match value {
            DatabaseValue::Null => Box::new(None::<i64>),
            DatabaseValue::Bool(v) => Box::new(*v),
            DatabaseValue::Int(v) => Box::new(*v),
            DatabaseValue::Long(v) => Box::new(*v),
            DatabaseValue::Float(v) => Box::new(f64::from(*v)),
            DatabaseValue::Double(v) => Box::new(*v),
            DatabaseValue::String(v) => Box::new(v.clone()),
            DatabaseValue::Bytes(v) => Box::new(v.clone()),
            DatabaseValue::DateTime(v) => Box::new(v.format(DATETIME_FORMAT).to_string()),
        }
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.config.path)
            .field("state", &self.state())
            .finish()
    }
}

impl Connection for SqliteConnection {
    type Cursor<'c> = SqliteCursor<'c>;

    fn state(&self) -> ConnectionState {
        if self.connection.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    fn open(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        let conn = rusqlite::Connection::open(&self.config.path)?;

        if self.config.foreign_keys {
            conn.execute("PRAGMA foreign_keys = ON", [])?;
        }
        if let Some(ms) = self.config.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }

        debug!(path = %self.config.path, "Opened SQLite connection");
        self.connection = Some(conn);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(conn) = self.connection.take() else {
            return Ok(());
        };
        match conn.close() {
            Ok(()) => {
                debug!(path = %self.config.path, "Closed SQLite connection");
                Ok(())
            }
            Err((conn, err)) => {
                self.connection = Some(conn);
                Err(err.into())
            }
        }
    }

    fn execute_non_query(&mut self, command: &Command) -> Result<u64> {
        let handle = self.handle()?;
        let mut stmt = Self::prepare(handle, command)?;
        if stmt.column_count() == 0 {
            let affected = stmt.raw_execute()?;
            return Ok(affected as u64);
        }

        // Row-returning statement: step to completion and discard the rows
        let read_only = stmt.readonly();
        let mut rows = stmt.raw_query();
        while rows.next()?.is_some() {}
        drop(rows);
        Ok(if read_only { 0 } else { handle.changes() as u64 })
    }

    fn execute_scalar(&mut self, command: &Command) -> Result<DatabaseValue> {
        let handle = self.handle()?;
        let mut stmt = Self::prepare(handle, command)?;
        if stmt.column_count() == 0 {
            stmt.raw_execute()?;
            return Ok(DatabaseValue::Null);
        }
        let mut rows = stmt.raw_query();
        match rows.next()? {
            Some(row) => Ok(Self::value_from_ref(row.get_ref(0)?)),
            None => Ok(DatabaseValue::Null),
        }
    }

    fn execute_cursor(
        &mut self,
        command: &Command,
        behavior: CursorBehavior,
    ) -> Result<Self::Cursor<'_>> {
        let handle = self.connection.take().ok_or_else(Self::not_open)?;
        let mut columns = Vec::new();
        let built = LiveRows::try_new_or_recover(
            handle,
            |connection| {
                let statement = Self::prepare(connection, command)?;
                columns = statement.column_names().into_iter().map(String::from).collect();
                Ok::<_, DatabaseError>(statement)
            },
            |statement| Ok::<_, DatabaseError>(statement.raw_query()),
        );

        match built {
            Ok(live) => Ok(SqliteCursor {
                owner: self,
                behavior,
                columns,
                live: Some(live),
            }),
            Err((err, heads)) => {
                self.connection = Some(heads.connection);
                Err(err)
            }
        }
    }
}

/// Handle, prepared statement and row iterator owned together
#[self_referencing]
struct LiveRows {
    connection: rusqlite::Connection,
    #[borrows(connection)]
    #[not_covariant]
    statement: Statement<'this>,
    #[borrows(mut statement)]
    #[not_covariant]
    rows: Rows<'this>,
}

/// Cursor over a SQLite result, stepping the statement once per read
pub struct SqliteCursor<'c> {
    owner: &'c mut SqliteConnection,
    behavior: CursorBehavior,
    columns: Vec<String>,
    live: Option<LiveRows>,
}

impl Cursor for SqliteCursor<'_> {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn read(&mut self) -> Result<Option<Vec<DatabaseValue>>> {
        let width = self.columns.len();
        let live = self.live.as_mut().ok_or(DatabaseError::CursorClosed)?;
        live.with_rows_mut(|rows| -> Result<Option<Vec<DatabaseValue>>> {
            match rows.next()? {
                Some(row) => Ok(Some(SqliteConnection::row_values(row, width)?)),
                None => Ok(None),
            }
        })
    }

    fn close(&mut self) -> Result<()> {
        let Some(live) = self.live.take() else {
            return Ok(());
        };
        self.owner.connection = Some(live.into_heads().connection);
        if self.behavior == CursorBehavior::CloseConnection {
            self.owner.close()?;
        }
        Ok(())
    }
}

impl Drop for SqliteCursor<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "Failed to close SQLite cursor");
        }
    }
}
