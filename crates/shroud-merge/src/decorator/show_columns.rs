//! SHOW COLUMNS results.

use shroud_core::EncryptRule;
use shroud_rewrite::StatementContext;

use crate::cursor::QueryResult;
use crate::error::MergeError;
use crate::merged::MergedResult;
use crate::value::{Value, ValueType};

use super::encrypt::EncryptMergedResult;
use super::single_table;

/// Index of the `Field` column in a SHOW COLUMNS row.
pub const FIELD_INDEX: usize = 0;

/// Presents the columns of one table under their logical names, hiding
/// assisted-query and like-query columns.
pub struct ShowColumnsMergedResult {
    inner: EncryptMergedResult,
}

impl ShowColumnsMergedResult {
    /// Fails with [`MergeError::UnsupportedSql`] unless the statement names
    /// exactly one table.
    pub fn new(
        result: Box<dyn QueryResult>,
        context: &StatementContext,
        rule: &EncryptRule,
    ) -> Result<Self, MergeError> {
        let table_name = single_table(context, "SHOW COLUMNS")?;
        let table = rule.find_table(table_name).cloned();
        tracing::debug!(
            table = table_name,
            encrypted = table.is_some(),
            "Decorating SHOW COLUMNS result"
        );
        Ok(Self {
            inner: EncryptMergedResult::new(result, table, FIELD_INDEX),
        })
    }
}

impl MergedResult for ShowColumnsMergedResult {
    fn advance(&mut self) -> Result<bool, MergeError> {
        self.inner.advance()
    }

    fn value_at(&mut self, index: usize, ty: ValueType) -> Result<Value, MergeError> {
        self.inner.value_at(index, ty)
    }

    fn was_null(&self) -> bool {
        self.inner.was_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::MemoryQueryResult;
    use crate::decorator::tests::{rule, user_columns};
    use pretty_assertions::assert_eq;
    use shroud_rewrite::{StatementKind, TableReference};

    fn context(tables: &[&str]) -> StatementContext {
        tables.iter().fold(
            StatementContext::new(StatementKind::ShowColumns),
            |context, table| context.with_table(TableReference::new(*table)),
        )
    }

    #[test]
    fn test_logical_view_of_columns() {
        let mut merged =
            ShowColumnsMergedResult::new(Box::new(user_columns()), &context(&["t_user"]), &rule())
                .unwrap();
        let mut rows = Vec::new();
        while merged.advance().unwrap() {
            rows.push((
                merged.value_at(0, ValueType::Text).unwrap().to_string(),
                merged.value_at(1, ValueType::Text).unwrap().to_string(),
            ));
        }
        assert_eq!(
            rows,
            vec![
                ("id".to_string(), "bigint".to_string()),
                ("user_id".to_string(), "varchar(64)".to_string()),
                ("order_id".to_string(), "bigint".to_string()),
            ]
        );
    }

    #[test]
    fn test_schema_qualified_table() {
        let mut merged = ShowColumnsMergedResult::new(
            Box::new(user_columns()),
            &context(&["shop.t_user"]),
            &rule(),
        )
        .unwrap();
        assert!(merged.advance().unwrap());
        assert!(merged.advance().unwrap());
        assert_eq!(merged.value_at(0, ValueType::Text).unwrap(), Value::text("user_id"));
    }

    #[test]
    fn test_requires_exactly_one_table() {
        for tables in [&[][..], &["t_user", "t_order"][..]] {
            let result = ShowColumnsMergedResult::new(
                Box::new(MemoryQueryResult::default()),
                &context(tables),
                &rule(),
            );
            assert!(matches!(
                result,
                Err(MergeError::UnsupportedSql { sql_kind: "SHOW COLUMNS", .. })
            ));
        }
    }
}
