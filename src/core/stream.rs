//! Lazy record sequence over a driver cursor
//!
//! [`RecordStream`] advances the cursor once per `next()` and releases it
//! exactly once: when the cursor reports the end, when a read fails, on an
//! explicit [`RecordStream::close`], or when the stream is dropped early
//! (a `break`, a `?` in the consumer, or a panic unwinding through it).

use super::driver::Cursor;
use super::error::Result;
use super::mapper::DataObject;
use super::record::Record;
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::{debug, warn};

/// Forward-only, single-pass sequence of [`Record`]s
#[must_use = "a stream holds its cursor (and possibly its connection) open until drained or dropped"]
pub struct RecordStream<K: Cursor> {
    cursor: Option<K>,
    columns: Arc<[String]>,
    rows_read: u64,
}

impl<K: Cursor> RecordStream<K> {
    /// Wrap an open cursor
    pub fn new(cursor: K) -> Self {
        let columns: Arc<[String]> = cursor.columns().to_vec().into();
        Self {
            cursor: Some(cursor),
            columns,
            rows_read: 0,
        }
    }

    /// A stream that yields nothing and holds no cursor
    pub fn empty() -> Self {
        Self {
            cursor: None,
            columns: Arc::from(Vec::<String>::new()),
            rows_read: 0,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows yielded so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Whether the cursor has been released
    pub fn is_released(&self) -> bool {
        self.cursor.is_none()
    }

    /// Release the cursor now, surfacing any close error
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    /// Map each remaining record into a fresh `T`
    pub fn into_objects<T: DataObject + Default>(self) -> impl Iterator<Item = Result<T>> {
        self.map(|record| record.and_then(|r| r.to_object()))
    }

    fn release(&mut self) -> Result<()> {
        match self.cursor.take() {
            Some(mut cursor) => {
                debug!(rows = self.rows_read, "Releasing cursor");
                cursor.close()
            }
            None => Ok(()),
        }
    }
}

impl<K: Cursor> Iterator for RecordStream<K> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        match cursor.read() {
            Ok(Some(values)) => {
                self.rows_read += 1;
                Some(Ok(Record::new(Arc::clone(&self.columns), values)))
            }
            Ok(None) => self.release().err().map(Err),
            Err(err) => {
                if let Err(close_err) = self.release() {
                    warn!(error = %close_err, "Failed to release cursor after read error");
                }
                Some(Err(err))
            }
        }
    }
}

impl<K: Cursor> FusedIterator for RecordStream<K> {}

impl<K: Cursor> Drop for RecordStream<K> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(error = %err, "Failed to release cursor on drop");
        }
    }
}
