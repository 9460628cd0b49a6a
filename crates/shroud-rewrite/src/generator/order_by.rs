//! ORDER BY and GROUP BY items.

use shroud_core::EncryptRule;

use crate::buffer::TokenBuffer;
use crate::statement::{SelectStatement, TableRef};

use super::resolve::{choose_column, rename_token, scope, ColumnResolver, ColumnUsage};

pub fn generate(select: &SelectStatement, rule: &EncryptRule, tokens: &mut TokenBuffer) {
    generate_select(select, &[], rule, tokens);
}

fn generate_select(
    select: &SelectStatement,
    outer: &[TableRef],
    rule: &EncryptRule,
    tokens: &mut TokenBuffer,
) {
    let tables = scope(&select.tables, outer);
    let resolver = ColumnResolver::new(&tables, rule);

    for item in select.group_by.iter().chain(&select.order_by) {
        let Some(resolved) = resolver.resolve(item) else {
            continue;
        };
        let physical = choose_column(resolved.table, resolved.column, ColumnUsage::Ordering);
        if tokens.push_unique(rename_token(item, physical.name)) {
            tracing::debug!(
                table = resolved.table.name(),
                column = resolved.column.logical_name(),
                physical = physical.name,
                "Rewriting ordering item"
            );
        }
    }

    for subquery in &select.subqueries {
        generate_select(&subquery.select, &tables, rule, tokens);
    }
}
