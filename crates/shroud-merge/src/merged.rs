//! The merged-result contract handed to the execution pipeline.

use crate::cursor::QueryResult;
use crate::error::MergeError;
use crate::value::{Value, ValueType};

/// A result as the client sees it, read in place of the raw cursor.
///
/// Only scalar and text reads are offered; calendar-aware decoding and
/// streaming reads always fail with [`MergeError::UnsupportedOperation`].
pub trait MergedResult {
    fn advance(&mut self) -> Result<bool, MergeError>;

    fn value_at(&mut self, index: usize, ty: ValueType) -> Result<Value, MergeError>;

    fn was_null(&self) -> bool;

    fn decode_calendar(
        &mut self,
        _index: usize,
        _ty: ValueType,
        _calendar: &str,
    ) -> Result<Value, MergeError> {
        Err(MergeError::UnsupportedOperation {
            operation: "decode_calendar",
        })
    }

    fn read_stream(&mut self, _index: usize, _ty: ValueType) -> Result<Vec<u8>, MergeError> {
        Err(MergeError::UnsupportedOperation {
            operation: "read_stream",
        })
    }
}

/// Presents a raw cursor unchanged.
pub struct TransparentMergedResult {
    result: Box<dyn QueryResult>,
}

impl TransparentMergedResult {
    pub fn new(result: Box<dyn QueryResult>) -> Self {
        Self { result }
    }
}

impl MergedResult for TransparentMergedResult {
    fn advance(&mut self) -> Result<bool, MergeError> {
        self.result.advance()
    }

    fn value_at(&mut self, index: usize, ty: ValueType) -> Result<Value, MergeError> {
        self.result.value_at(index, ty)
    }

    fn was_null(&self) -> bool {
        self.result.was_null()
    }
}
