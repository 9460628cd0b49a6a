//! Result decorators.
//!
//! Each decorator wraps the raw cursor of one statement and presents the
//! logical view of the encrypted tables it touches.

pub mod decrypt;
pub mod encrypt;
pub mod show_columns;
pub mod show_create_table;

use shroud_rewrite::StatementContext;

use crate::error::MergeError;

/// Name of the only table a SHOW statement refers to.
pub(crate) fn single_table<'a>(
    context: &'a StatementContext,
    sql_kind: &'static str,
) -> Result<&'a str, MergeError> {
    match context.tables.as_slice() {
        [table] => Ok(table.name.as_str()),
        tables => Err(MergeError::UnsupportedSql {
            sql_kind,
            reason: format!("expected exactly one table, found {}", tables.len()),
        }),
    }
}
