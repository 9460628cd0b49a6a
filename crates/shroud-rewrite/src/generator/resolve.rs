//! Column resolution and physical column selection shared by the read-path
//! generators.

use std::sync::Arc;

use shroud_core::{ColumnRole, EncryptColumn, EncryptRule, EncryptTable, PhysicalColumn};

use crate::statement::{ColumnRef, PredicateOperator, TableRef};
use crate::token::{Splice, SqlToken, SubstituteProjection};

/// Maps column references of one statement to catalog entries.
pub(crate) struct ColumnResolver<'a> {
    tables: &'a [TableRef],
    rule: &'a EncryptRule,
}

/// An encrypted column a reference resolved to.
pub(crate) struct ResolvedColumn<'a> {
    pub table: &'a Arc<EncryptTable>,
    pub column: &'a EncryptColumn,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(tables: &'a [TableRef], rule: &'a EncryptRule) -> Self {
        Self { tables, rule }
    }

    /// Resolve `column` to an encrypted logical column.
    ///
    /// A qualified column resolves through a table alias, then a table name.
    /// An unqualified one resolves to the first table whose catalog entry
    /// declares it.
    pub fn resolve(&self, column: &ColumnRef) -> Option<ResolvedColumn<'a>> {
        let name = column.name.value.as_str();
        match &column.owner {
            Some(owner) => {
                let table_name = self
                    .tables
                    .iter()
                    .find(|t| {
                        t.alias
                            .as_ref()
                            .is_some_and(|alias| alias.value.eq_ignore_ascii_case(&owner.value))
                    })
                    .or_else(|| {
                        self.tables
                            .iter()
                            .find(|t| t.name.value.eq_ignore_ascii_case(&owner.value))
                    })
                    .map_or(owner.value.as_str(), |t| t.name.value.as_str());
                let table = self.rule.find_table(table_name)?;
                let column = table.find_encrypt_column(name)?;
                Some(ResolvedColumn { table, column })
            }
            None => self.tables.iter().find_map(|t| {
                let table = self.rule.find_table(&t.name.value)?;
                let column = table.find_encrypt_column(name)?;
                Some(ResolvedColumn { table, column })
            }),
        }
    }
}

/// Tables visible to a SELECT: its own, then those of enclosing queries.
pub(crate) fn scope(tables: &[TableRef], outer: &[TableRef]) -> Vec<TableRef> {
    tables.iter().chain(outer).cloned().collect()
}

/// Replace a column reference's name, keeping its owner and quoting.
pub(crate) fn rename_token(column: &ColumnRef, physical: &str) -> SqlToken {
    SqlToken::substitute(
        column.name.span,
        vec![SubstituteProjection::new(physical, column.name.quote)],
        Splice::InPlace,
    )
}

/// Where a column reference appears, which decides the physical column read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnUsage {
    /// Top-level, table-subquery or scalar projection.
    Projection,
    /// Projection of a predicate subquery, compared by the outer query.
    PredicateSubquery,
    /// Left or right side of a predicate.
    Predicate(PredicateOperator),
    /// ORDER BY or GROUP BY item.
    Ordering,
}

/// Pick the physical column a read uses.
///
/// Plain wins when the table does not query with cipher and a plain column
/// exists; then the assisted-query or like-query column when the usage
/// compares by it; the cipher column otherwise.
pub(crate) fn choose_column<'a>(
    table: &EncryptTable,
    column: &'a EncryptColumn,
    usage: ColumnUsage,
) -> PhysicalColumn<'a> {
    if !table.query_with_cipher_column() {
        if let Some(name) = column.plain() {
            return PhysicalColumn {
                name,
                role: ColumnRole::Plain,
            };
        }
    }

    let preferred = match usage {
        ColumnUsage::Projection => None,
        ColumnUsage::PredicateSubquery | ColumnUsage::Ordering => Some(ColumnRole::AssistedQuery),
        ColumnUsage::Predicate(operator) if operator.is_assisted_query_eligible() => {
            Some(ColumnRole::AssistedQuery)
        }
        ColumnUsage::Predicate(operator) if operator.is_like_query_eligible() => {
            Some(ColumnRole::LikeQuery)
        }
        ColumnUsage::Predicate(_) => None,
    };

    preferred
        .and_then(|role| column.role_name(role).map(|name| PhysicalColumn { name, role }))
        .unwrap_or(PhysicalColumn {
            name: column.cipher().name(),
            role: ColumnRole::Cipher,
        })
}
