//! Driver implementations
//!
//! This module contains concrete implementations of the
//! [`Connection`](crate::core::Connection) trait for specific databases.

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConfig, SqliteConnection, SqliteCursor};
