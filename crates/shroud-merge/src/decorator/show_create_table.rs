//! SHOW CREATE TABLE results.

use std::sync::Arc;

use shroud_core::{EncryptRule, EncryptTable};
use shroud_rewrite::StatementContext;

use crate::cursor::QueryResult;
use crate::ddl::rewrite_create_table;
use crate::error::MergeError;
use crate::merged::MergedResult;
use crate::value::{Value, ValueType};

use super::single_table;

/// Index of the `Create Table` column in a SHOW CREATE TABLE row.
pub const CREATE_TABLE_INDEX: usize = 1;

/// Presents the `CREATE TABLE` text of one table with logical columns.
pub struct ShowCreateTableMergedResult {
    result: Box<dyn QueryResult>,
    table: Option<Arc<EncryptTable>>,
    /// Rewritten DDL of the current row, filled on first read.
    current_ddl: Option<Value>,
    was_null: bool,
}

impl ShowCreateTableMergedResult {
    /// Fails with [`MergeError::UnsupportedSql`] unless the statement names
    /// exactly one table.
    pub fn new(
        result: Box<dyn QueryResult>,
        context: &StatementContext,
        rule: &EncryptRule,
    ) -> Result<Self, MergeError> {
        let table_name = single_table(context, "SHOW CREATE TABLE")?;
        let table = rule.find_table(table_name).cloned();
        tracing::debug!(
            table = table_name,
            encrypted = table.is_some(),
            "Decorating SHOW CREATE TABLE result"
        );
        Ok(Self {
            result,
            table,
            current_ddl: None,
            was_null: false,
        })
    }
}

impl MergedResult for ShowCreateTableMergedResult {
    fn advance(&mut self) -> Result<bool, MergeError> {
        self.current_ddl = None;
        self.was_null = false;
        self.result.advance()
    }

    fn value_at(&mut self, index: usize, ty: ValueType) -> Result<Value, MergeError> {
        let table = match &self.table {
            Some(table) if index == CREATE_TABLE_INDEX => table,
            _ => {
                let value = self.result.value_at(index, ty)?;
                self.was_null = self.result.was_null();
                return Ok(value);
            }
        };

        let ddl = match &self.current_ddl {
            Some(ddl) => ddl.clone(),
            None => {
                let raw = self.result.value_at(index, ValueType::Any)?;
                let ddl = match raw.as_text() {
                    Some(text) => Value::text(rewrite_create_table(text, table)),
                    None => raw,
                };
                self.current_ddl = Some(ddl.clone());
                ddl
            }
        };
        self.was_null = ddl.is_null();
        ddl.convert(ty)
            .ok_or(MergeError::InvalidValue { index, expected: ty })
    }

    fn was_null(&self) -> bool {
        self.was_null
    }
}
