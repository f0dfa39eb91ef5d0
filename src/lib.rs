//! # Rust Data Access
//!
//! A driver-agnostic data-access layer. Callers pass SQL with named
//! placeholders and positional values; the layer binds them, opens and
//! restores the connection as needed, runs the statement in one of four
//! modes, and maps the resulting rows onto plain structs.
//!
//! ## Features
//!
//! - **Named Binding**: `:name` and `@name` placeholders, bound once per distinct name
//! - **Connection Lifecycle**: closed connections are opened for the call and closed again
//! - **Four Execution Modes**: scalar, non-query, buffered table, lazy record stream
//! - **Interceptors**: observe or cancel executions, with logging and metrics built in
//! - **Object Mapping**: case-insensitive column-to-field mapping with value coercion
//! - **Synchronous Drivers**: a small [`Connection`] trait; SQLite ships as the default backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_data_access::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! rust_data_access::data_object!(User { id, name });
//!
//! fn main() -> Result<()> {
//!     let executor = Executor::new();
//!     let mut conn = SqliteConnection::new("app.db");
//!
//!     executor.execute_non_query(
//!         &mut conn,
//!         "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, name TEXT)",
//!         &[],
//!     )?;
//!     executor.execute_non_query(
//!         &mut conn,
//!         "INSERT INTO users (name) VALUES (:name)",
//!         &["Alice".into()],
//!     )?;
//!
//!     // The connection was closed on entry and is closed again after each call
//!     for user in executor
//!         .execute_records(&mut conn, "SELECT id, name FROM users", &[])?
//!         .into_objects::<User>()
//!     {
//!         println!("{:?}", user?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! src/
//! ├── core/
//! │   ├── command.rs      # Commands and placeholder binding
//! │   ├── config.rs       # Executor configuration
//! │   ├── driver.rs       # Connection and Cursor traits
//! │   ├── error.rs        # Error types
//! │   ├── executor.rs     # The four execution modes
//! │   ├── interceptor.rs  # Execution hooks, logging, metrics
//! │   ├── lifecycle.rs    # Open/restore connection state
//! │   ├── mapper.rs       # Record-to-object mapping
//! │   ├── record.rs       # Records and buffered tables
//! │   ├── stream.rs       # Lazy record stream
//! │   └── value.rs        # Value type
//! ├── backends/
//! │   └── sqlite.rs       # SQLite driver
//! └── lib.rs
//! ```

/// Core data-access types and traits
pub mod core;

/// Driver implementations
pub mod backends;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_data_access::prelude::*;
///
/// let command = Command::build("SELECT :a", &[1.into()], &BindOptions::default()).unwrap();
/// assert_eq!(command.parameters().len(), 1);
/// ```
pub mod prelude {
    pub use crate::core::{
        BindOptions, Command, Connection, ConnectionState, Cursor, CursorBehavior, DataObject,
        DataTable, DatabaseError, DatabaseValue, Decision, Executed, Executing, ExecutionFailed,
        ExecutionKind, Executor, ExecutorConfig, Interceptor, LoggingConfig, MetricsInterceptor,
        Outcome, Record, RecordStream, Result,
    };

    #[cfg(feature = "sqlite")]
    pub use crate::backends::{SqliteConfig, SqliteConnection};
}

// Re-export at root level for convenience
pub use core::{
    Command, Connection, ConnectionState, Cursor, CursorBehavior, DataObject, DataTable,
    DatabaseError, DatabaseValue, Executor, ExecutorConfig, Record, RecordStream, Result,
};

#[cfg(feature = "sqlite")]
pub use backends::SqliteConnection;
