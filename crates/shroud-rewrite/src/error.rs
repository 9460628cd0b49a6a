//! Error types for the rewrite crate.

use thiserror::Error;

/// Errors that can occur while analyzing or rewriting SQL.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// SQL parsing failed.
    #[error("failed to parse SQL: {0}")]
    ParseError(String),

    /// A token points outside the SQL text or inside a multi-byte character.
    #[error("token [{start}, {end}) does not fit SQL of length {len}")]
    InvalidToken { start: usize, end: usize, len: usize },

    /// `CHANGE COLUMN` between columns whose encryption settings differ.
    #[error(
        "cannot change column `{previous}` to `{column}` of table `{table}`: encryption settings differ"
    )]
    EncryptColumnAlter {
        table: String,
        column: String,
        previous: String,
    },

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
