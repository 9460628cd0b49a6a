//! WHERE, HAVING and JOIN ... ON predicates, including subqueries.
//!
//! Literals compared with an encrypted column are encrypted with the
//! encryptor of the physical column the predicate reads.

use shroud_core::{ColumnRole, EncryptRule};

use crate::buffer::TokenBuffer;
use crate::statement::{
    ColumnRef, PredicateOperator, PredicateValue, SelectStatement, TableRef, WhereSegment,
};
use crate::token::{SqlToken, ValueItem};

use super::assignment::encrypt_value;
use super::resolve::{
    choose_column, rename_token, scope, ColumnResolver, ColumnUsage, ResolvedColumn,
};

/// Predicates of a SELECT and of every subquery below it.
pub fn generate(select: &SelectStatement, rule: &EncryptRule, tokens: &mut TokenBuffer) {
    generate_select(select, &[], rule, tokens);
}

/// Predicates of an UPDATE or DELETE condition.
pub fn generate_where(
    where_clause: &WhereSegment,
    tables: &[TableRef],
    rule: &EncryptRule,
    tokens: &mut TokenBuffer,
) {
    generate_segment(where_clause, &ColumnResolver::new(tables, rule), tokens);
}

fn generate_select(
    select: &SelectStatement,
    outer: &[TableRef],
    rule: &EncryptRule,
    tokens: &mut TokenBuffer,
) {
    let tables = scope(&select.tables, outer);
    let resolver = ColumnResolver::new(&tables, rule);

    let segments = select
        .where_clause
        .iter()
        .chain(&select.join_conditions)
        .chain(select.having.iter());
    for segment in segments {
        generate_segment(segment, &resolver, tokens);
    }

    for subquery in &select.subqueries {
        generate_select(&subquery.select, &tables, rule, tokens);
    }
}

fn generate_segment(segment: &WhereSegment, resolver: &ColumnResolver<'_>, tokens: &mut TokenBuffer) {
    for predicate in segment.predicates() {
        let target = generate_column(&predicate.column, predicate.operator, resolver, tokens);
        for value in &predicate.values {
            match value {
                PredicateValue::Column(column) => {
                    generate_column(column, predicate.operator, resolver, tokens);
                }
                PredicateValue::Literal { value: literal, span } => {
                    let Some((resolved, role)) = &target else {
                        continue;
                    };
                    if *role == ColumnRole::Plain {
                        continue;
                    }
                    let encrypted = encrypt_value(resolved.table, resolved.column, *role, literal);
                    tokens.push_unique(SqlToken::values(*span, vec![ValueItem::Literal(encrypted)]));
                }
                PredicateValue::Parameter { .. } => {}
            }
        }
    }
}

/// Rename `column` to the physical column the predicate reads, returning
/// the column and the role read.
fn generate_column<'a>(
    column: &ColumnRef,
    operator: PredicateOperator,
    resolver: &ColumnResolver<'a>,
    tokens: &mut TokenBuffer,
) -> Option<(ResolvedColumn<'a>, ColumnRole)> {
    let resolved = resolver.resolve(column)?;
    let physical = choose_column(resolved.table, resolved.column, ColumnUsage::Predicate(operator));
    let role = physical.role;
    if tokens.push_unique(rename_token(column, physical.name)) {
        tracing::debug!(
            table = resolved.table.name(),
            column = resolved.column.logical_name(),
            physical = physical.name,
            role = %physical.role,
            "Rewriting predicate column"
        );
    }
    Some((resolved, role))
}
