//! Base decorator for results listing column names.

use std::sync::Arc;

use shroud_core::EncryptTable;

use crate::cursor::QueryResult;
use crate::error::MergeError;
use crate::merged::MergedResult;
use crate::value::{Value, ValueType};

/// Wraps a cursor whose rows each describe one physical column, the name
/// sitting at `name_index`.
///
/// Rows naming an assisted-query or like-query column are skipped, and a
/// cipher column name reads as its logical name. Without a catalog entry for
/// the table the cursor passes through unchanged.
pub struct EncryptMergedResult {
    result: Box<dyn QueryResult>,
    table: Option<Arc<EncryptTable>>,
    name_index: usize,
    /// Name field of the current row, read while advancing.
    current_name: Option<Value>,
    /// Whether the last value read was SQL `NULL`.
    was_null: bool,
}

impl EncryptMergedResult {
    pub fn new(
        result: Box<dyn QueryResult>,
        table: Option<Arc<EncryptTable>>,
        name_index: usize,
    ) -> Self {
        Self {
            result,
            table,
            name_index,
            current_name: None,
            was_null: false,
        }
    }

    pub fn table(&self) -> Option<&Arc<EncryptTable>> {
        self.table.as_ref()
    }

    fn logical_name(&self, name: Value) -> Value {
        let (Some(table), Some(raw)) = (&self.table, name.as_text()) else {
            return name;
        };
        match table.logical_name_for_cipher(raw) {
            Some(logical) => Value::text(logical),
            None => name,
        }
    }
}

impl MergedResult for EncryptMergedResult {
    fn advance(&mut self) -> Result<bool, MergeError> {
        self.current_name = None;
        self.was_null = false;
        let Some(table) = self.table.clone() else {
            return self.result.advance();
        };

        while self.result.advance()? {
            let name = self.result.value_at(self.name_index, ValueType::Any)?;
            match name.as_text() {
                Some(raw) if table.is_derived_column(raw) => {
                    tracing::trace!(table = table.name(), column = raw, "Hiding derived column row");
                }
                _ => {
                    self.current_name = Some(name);
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn value_at(&mut self, index: usize, ty: ValueType) -> Result<Value, MergeError> {
        if index != self.name_index || self.table.is_none() {
            let value = self.result.value_at(index, ty)?;
            self.was_null = self.result.was_null();
            return Ok(value);
        }
        let name = match &self.current_name {
            Some(name) => name.clone(),
            None => self.result.value_at(index, ValueType::Any)?,
        };
        self.was_null = name.is_null();
        self.logical_name(name)
            .convert(ty)
            .ok_or(MergeError::InvalidValue { index, expected: ty })
    }

    fn was_null(&self) -> bool {
        self.was_null
    }
}
