//! Result rows and buffered tables

use super::error::Result;
use super::mapper::{map_record_into_object, DataObject};
use super::value::DatabaseValue;
use std::sync::Arc;

/// One row of a result
///
/// Name lookup through [`Record::get`] is case-sensitive, as the driver
/// reports names; use [`Record::get_ignore_case`] when resolving user-facing
/// names.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<DatabaseValue>,
}

impl Record {
    /// Create a record; `values` are positional against `columns`
    pub fn new(columns: Arc<[String]>, values: Vec<DatabaseValue>) -> Self {
        Self { columns, values }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[DatabaseValue] {
        &self.values
    }

    /// Value at a column position
    pub fn get_index(&self, index: usize) -> Option<&DatabaseValue> {
        self.values.get(index)
    }

    /// Value of the first column with exactly this name
    pub fn get(&self, name: &str) -> Option<&DatabaseValue> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }

    /// Position of the first column matching `name`, ignoring ASCII case
    pub fn index_of_ignore_case(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Value of the first column matching `name`, ignoring ASCII case
    pub fn get_ignore_case(&self, name: &str) -> Option<&DatabaseValue> {
        self.index_of_ignore_case(name)
            .and_then(|i| self.values.get(i))
    }

    /// Whether the value at `index` is SQL NULL (or absent)
    pub fn is_null(&self, index: usize) -> bool {
        self.values.get(index).map_or(true, DatabaseValue::is_null)
    }

    /// Column name and value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Populate a fresh `T` from this record
    pub fn to_object<T: DataObject + Default>(&self) -> Result<T> {
        let mut object = T::default();
        map_record_into_object(self, &mut object)?;
        Ok(object)
    }
}

/// A fully buffered query result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl DataTable {
    /// Create an empty table with no columns
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a row, adopting its columns if the table has none yet
    pub fn push(&mut self, record: Record) {
        if self.columns.is_empty() {
            self.columns = record.columns().to_vec();
        }
        self.rows.push(record);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }

    /// Map every row into a fresh `T`
    pub fn to_objects<T: DataObject + Default>(&self) -> Result<Vec<T>> {
        self.rows.iter().map(Record::to_object).collect()
    }

    pub(crate) fn set_columns(&mut self, columns: &[String]) {
        if self.columns.is_empty() {
            self.columns = columns.to_vec();
        }
    }
}

impl<'a> IntoIterator for &'a DataTable {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl IntoIterator for DataTable {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
