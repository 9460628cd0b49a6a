//! Error types for the merge crate.

use shroud_core::EncryptorError;
use thiserror::Error;

use crate::value::ValueType;

/// Errors that can occur while reading a decorated result.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The accessor is not offered by encrypt decorators.
    #[error("operation {operation} is not supported")]
    UnsupportedOperation { operation: &'static str },

    /// The statement cannot be decorated.
    #[error("unsupported SQL for {sql_kind}: {reason}")]
    UnsupportedSql { sql_kind: &'static str, reason: String },

    /// A column index past the end of the row.
    #[error("column index {index} out of range for {count} columns")]
    ColumnIndexOutOfRange { index: usize, count: usize },

    /// A value was read before the first `advance()` or after the last row.
    #[error("no current row")]
    NoCurrentRow,

    /// A value could not be converted to the requested type.
    #[error("column {index} cannot be read as {expected:?}")]
    InvalidValue { index: usize, expected: ValueType },

    /// Decrypting a stored value failed.
    #[error(transparent)]
    Decrypt(#[from] EncryptorError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
