//! INSERT column lists and `VALUES` rows.
//!
//! An encrypted column in the column list becomes its physical columns, and
//! the value at its position in every row becomes one value per physical
//! column. A column is only rewritten when every row holds a `?` or a
//! literal at its position; anything else would leave the row short of
//! values.

use shroud_core::EncryptRule;

use crate::buffer::TokenBuffer;
use crate::statement::{AssignmentValue, ColumnRef, InsertStatement};
use crate::token::{Splice, SqlToken, SubstituteProjection, ValueItem};

use super::assignment::encrypt_value;
use super::resolve::{ColumnResolver, ResolvedColumn};

/// An encrypted column of the column list, with its position in each row.
pub(crate) struct InsertColumn<'a> {
    pub index: usize,
    pub reference: &'a ColumnRef,
    pub resolved: ResolvedColumn<'a>,
    /// Every row holds a `?` or a literal at `index`.
    pub rewritable: bool,
}

/// Encrypted columns of the column list of `statement`.
pub(crate) fn encrypted_columns<'a>(
    statement: &'a InsertStatement,
    rule: &'a EncryptRule,
) -> Vec<InsertColumn<'a>> {
    let resolver = ColumnResolver::new(std::slice::from_ref(&statement.table), rule);
    statement
        .columns
        .iter()
        .enumerate()
        .filter_map(|(index, reference)| {
            let resolved = resolver.resolve(reference)?;
            let rewritable = statement.rows.iter().all(|row| {
                matches!(
                    row.values.get(index).map(|value| &value.value),
                    Some(AssignmentValue::Parameter { .. } | AssignmentValue::Literal(_))
                )
            });
            Some(InsertColumn {
                index,
                reference,
                resolved,
                rewritable,
            })
        })
        .collect()
}

pub fn generate(statement: &InsertStatement, rule: &EncryptRule, tokens: &mut TokenBuffer) {
    if statement.columns.is_empty() && rule.is_encrypt_table(&statement.table.name.value) {
        tracing::warn!(
            table = statement.table.name.value.as_str(),
            "INSERT without column list, values left unchanged"
        );
    }

    for column in encrypted_columns(statement, rule) {
        if !column.rewritable {
            tracing::warn!(
                table = column.resolved.table.name(),
                column = column.resolved.column.logical_name(),
                "INSERT value is not a parameter or literal, column left unchanged"
            );
            continue;
        }
        let physical = column.resolved.column.physical_columns();
        let owner = column.reference.owner.as_ref().map(|o| o.value.clone());
        let quote = column.reference.name.quote;
        let names = physical
            .iter()
            .map(|p| SubstituteProjection::new(p.name, quote).with_owner(owner.clone()))
            .collect();
        tokens.push(SqlToken::substitute(column.reference.span(), names, Splice::InPlace));

        for row in &statement.rows {
            let Some(value) = row.values.get(column.index) else {
                continue;
            };
            let items = match &value.value {
                AssignmentValue::Parameter { .. } => vec![ValueItem::Parameter; physical.len()],
                AssignmentValue::Literal(literal) => physical
                    .iter()
                    .map(|p| {
                        ValueItem::Literal(encrypt_value(
                            column.resolved.table,
                            column.resolved.column,
                            p.role,
                            literal,
                        ))
                    })
                    .collect(),
                AssignmentValue::Values(_) | AssignmentValue::Expression => continue,
            };
            tokens.push(SqlToken::values(value.span, items));
        }

        tracing::debug!(
            table = column.resolved.table.name(),
            column = column.resolved.column.logical_name(),
            physical_columns = physical.len(),
            rows = statement.rows.len(),
            "Rewriting INSERT column"
        );
    }
}
