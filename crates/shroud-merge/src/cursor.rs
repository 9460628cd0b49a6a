//! Raw row cursors.

use crate::error::MergeError;
use crate::value::{Value, ValueType};

/// A forward-only cursor over the rows a backend returned.
///
/// Indices are zero-based.
pub trait QueryResult {
    /// Move to the next row, `false` once the rows are exhausted.
    fn advance(&mut self) -> Result<bool, MergeError>;

    /// Read a field of the current row as `ty`.
    fn value_at(&mut self, index: usize, ty: ValueType) -> Result<Value, MergeError>;

    /// Whether the last value read was NULL.
    fn was_null(&self) -> bool;

    fn column_count(&self) -> usize;

    fn column_label(&self, index: usize) -> Result<String, MergeError>;
}

/// A cursor over rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueryResult {
    labels: Vec<String>,
    rows: Vec<Vec<Value>>,
    /// Index of the current row plus one; zero before the first `advance()`.
    position: usize,
    was_null: bool,
}

impl MemoryQueryResult {
    pub fn new(labels: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            labels,
            rows,
            position: 0,
            was_null: false,
        }
    }

    /// A cursor whose columns are labelled by `labels`.
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(labels.into_iter().map(Into::into).collect(), Vec::new())
    }

    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    fn current(&self) -> Result<&[Value], MergeError> {
        self.position
            .checked_sub(1)
            .and_then(|idx| self.rows.get(idx))
            .map(Vec::as_slice)
            .ok_or(MergeError::NoCurrentRow)
    }
}

impl QueryResult for MemoryQueryResult {
    fn advance(&mut self) -> Result<bool, MergeError> {
        if self.position < self.rows.len() {
            self.position += 1;
            Ok(true)
        } else {
            self.position = self.rows.len() + 1;
            Ok(false)
        }
    }

    fn value_at(&mut self, index: usize, ty: ValueType) -> Result<Value, MergeError> {
        let row = self.current()?;
        let value = row
            .get(index)
            .cloned()
            .ok_or(MergeError::ColumnIndexOutOfRange {
                index,
                count: row.len(),
            })?;
        self.was_null = value.is_null();
        value
            .convert(ty)
            .ok_or(MergeError::InvalidValue { index, expected: ty })
    }

    fn was_null(&self) -> bool {
        self.was_null
    }

    fn column_count(&self) -> usize {
        self.labels.len()
    }

    fn column_label(&self, index: usize) -> Result<String, MergeError> {
        self.labels
            .get(index)
            .cloned()
            .ok_or(MergeError::ColumnIndexOutOfRange {
                index,
                count: self.labels.len(),
            })
    }
}
