//! Core data-access types and traits
//!
//! This module provides the driver contract, command binding, the executor
//! with its four execution modes, result records and the object mapper.

pub mod command;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod interceptor;
pub mod lifecycle;
pub mod mapper;
pub mod record;
pub mod stream;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use command::{discover_placeholders, Command, DbType, Parameter, Placeholder};
pub use config::{BindOptions, ExecutorConfig, LoggingConfig};
pub use driver::{Connection, ConnectionState, Cursor, CursorBehavior};
pub use error::{DatabaseError, Result};
pub use executor::{Executor, InterceptorId};
pub use interceptor::{
    Decision, Executed, Executing, ExecutionFailed, ExecutionKind, ExecutionStats, Interceptor,
    LoggingInterceptor, MetricsInterceptor, Outcome,
};
pub use lifecycle::{open_for_cursor, ConnectionScope};
pub use mapper::{copy_fields_into_parameters, map_record_into_object, DataObject, FieldMap, FieldValue};
pub use record::{DataTable, Record};
pub use stream::RecordStream;
pub use value::DatabaseValue;
