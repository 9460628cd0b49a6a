//! SELECT projections.
//!
//! Column projections are replaced from the column name through the end of
//! the projection, so the alias is rewritten too: an encrypted column keeps
//! presenting its logical name through an injected alias. `*` and `t.*` are
//! expanded to their actual columns whenever one of them is encrypted, and
//! the expansion replaces any token another generator placed at the same
//! start. Columns read inside an expression such as `UPPER(pwd)` are renamed
//! in place.
//!
//! Inside subqueries the projected physical columns depend on where the
//! subquery sits:
//!
//! | Subquery | Projected | Alias |
//! |----------|-----------|-------|
//! | predicate (`IN (SELECT ...)`) | plain, assisted query or cipher | none |
//! | `EXISTS` | cipher | none |
//! | FROM | every physical column | none |
//! | otherwise | plain or cipher | logical name |

use shroud_core::{EncryptColumn, EncryptRule, EncryptTable};

use crate::buffer::TokenBuffer;
use crate::statement::{
    ColumnProjection, ColumnRef, Projection, QuoteCharacter, SelectStatement, ShorthandProjection,
    Span, SubqueryKind, TableRef,
};
use crate::token::{Splice, SqlToken, SubstituteProjection};

use super::resolve::{choose_column, rename_token, scope, ColumnResolver, ColumnUsage};

pub fn generate(select: &SelectStatement, rule: &EncryptRule, tokens: &mut TokenBuffer) {
    generate_select(select, None, &[], rule, tokens);
}

fn generate_select(
    select: &SelectStatement,
    kind: Option<SubqueryKind>,
    outer: &[TableRef],
    rule: &EncryptRule,
    tokens: &mut TokenBuffer,
) {
    let tables = scope(&select.tables, outer);
    let resolver = ColumnResolver::new(&tables, rule);

    for projection in &select.projections {
        match projection {
            Projection::Column(column) => {
                if let Some(token) = column_token(column, kind, &resolver) {
                    tokens.push(token);
                }
            }
            Projection::Shorthand(shorthand) => {
                if let Some(token) = shorthand_token(shorthand, kind, &tables, &resolver) {
                    let superseded = tokens.remove_anchored_at(token.span.start);
                    if superseded > 0 {
                        tracing::trace!(
                            start = token.span.start,
                            superseded,
                            "Shorthand expansion supersedes earlier tokens"
                        );
                    }
                    tokens.push(token);
                }
            }
            Projection::Expression { columns, .. } => {
                expression_tokens(columns, kind, &resolver, tokens);
            }
        }
    }

    for subquery in &select.subqueries {
        generate_select(&subquery.select, Some(subquery.kind), &tables, rule, tokens);
    }
}

fn column_token(
    projection: &ColumnProjection,
    kind: Option<SubqueryKind>,
    resolver: &ColumnResolver<'_>,
) -> Option<SqlToken> {
    let column = &projection.column;
    let resolved = resolver.resolve(column)?;
    let alias = projection
        .alias
        .as_ref()
        .map_or(column.name.value.as_str(), |alias| alias.value.as_str());

    let projections = physical_projections(
        resolved.table,
        resolved.column,
        kind,
        None,
        alias,
        column.name.quote,
    );
    tracing::debug!(
        table = resolved.table.name(),
        column = resolved.column.logical_name(),
        projections = projections.len(),
        "Rewriting projection"
    );
    Some(SqlToken::substitute(
        Span::new(column.name.span.start, projection.span.end),
        projections,
        Splice::InPlace,
    ))
}

fn expression_tokens(
    columns: &[ColumnRef],
    kind: Option<SubqueryKind>,
    resolver: &ColumnResolver<'_>,
    tokens: &mut TokenBuffer,
) {
    let usage = match kind {
        Some(SubqueryKind::Predicate) => ColumnUsage::PredicateSubquery,
        _ => ColumnUsage::Projection,
    };
    for column in columns {
        let Some(resolved) = resolver.resolve(column) else {
            continue;
        };
        let physical = choose_column(resolved.table, resolved.column, usage);
        if tokens.push_unique(rename_token(column, physical.name)) {
            tracing::debug!(
                table = resolved.table.name(),
                column = resolved.column.logical_name(),
                physical = physical.name,
                "Rewriting column inside projection expression"
            );
        }
    }
}

fn shorthand_token(
    shorthand: &ShorthandProjection,
    kind: Option<SubqueryKind>,
    tables: &[TableRef],
    resolver: &ColumnResolver<'_>,
) -> Option<SqlToken> {
    let mut encrypted = false;
    let mut projections = Vec::with_capacity(shorthand.actual_columns.len());

    let owned = shorthand.actual_columns.iter().filter(|column| {
        shorthand
            .owner
            .as_ref()
            .is_none_or(|owner| owned_by(column, &owner.value, tables))
    });
    for column in owned {
        let owner = shorthand
            .owner
            .as_ref()
            .or(column.owner.as_ref())
            .map(|owner| owner.value.clone());
        match resolver.resolve(column) {
            Some(resolved) => {
                encrypted = true;
                projections.extend(physical_projections(
                    resolved.table,
                    resolved.column,
                    kind,
                    owner,
                    &column.name.value,
                    column.name.quote,
                ));
            }
            None => projections.push(passthrough(column, owner)),
        }
    }

    if !encrypted {
        return None;
    }
    tracing::debug!(
        owner = shorthand.owner.as_ref().map(|o| o.value.as_str()),
        columns = projections.len(),
        "Expanding shorthand projection"
    );
    Some(SqlToken::substitute(
        Span::new(shorthand.start(), shorthand.span.end),
        projections,
        Splice::InPlace,
    ))
}

/// Whether `column` belongs to the table that `owner` names, through its
/// alias or its table name.
fn owned_by(column: &ColumnRef, owner: &str, tables: &[TableRef]) -> bool {
    let Some(column_owner) = &column.owner else {
        return true;
    };
    let column_owner = column_owner.value.as_str();
    if column_owner.eq_ignore_ascii_case(owner) {
        return true;
    }
    let names = |table: &TableRef, name: &str| {
        table.name.value.eq_ignore_ascii_case(name)
            || table
                .alias
                .as_ref()
                .is_some_and(|alias| alias.value.eq_ignore_ascii_case(name))
    };
    tables
        .iter()
        .find(|table| {
            table
                .alias
                .as_ref()
                .is_some_and(|alias| alias.value.eq_ignore_ascii_case(owner))
        })
        .or_else(|| tables.iter().find(|table| table.name.value.eq_ignore_ascii_case(owner)))
        .is_some_and(|table| names(table, column_owner))
}

fn passthrough(column: &ColumnRef, owner: Option<String>) -> SubstituteProjection {
    SubstituteProjection::new(&column.name.value, column.name.quote).with_owner(owner)
}

fn physical_projections(
    table: &EncryptTable,
    column: &EncryptColumn,
    kind: Option<SubqueryKind>,
    owner: Option<String>,
    alias: &str,
    quote: QuoteCharacter,
) -> Vec<SubstituteProjection> {
    let named = |name: &str| SubstituteProjection::new(name, quote).with_owner(owner.clone());
    match kind {
        Some(SubqueryKind::Predicate) => {
            vec![named(choose_column(table, column, ColumnUsage::PredicateSubquery).name)]
        }
        Some(SubqueryKind::Exists) => vec![named(column.cipher().name())],
        Some(SubqueryKind::Table) => column
            .physical_columns()
            .into_iter()
            .map(|physical| named(physical.name))
            .collect(),
        Some(SubqueryKind::Projection) | None => {
            let physical = choose_column(table, column, ColumnUsage::Projection);
            vec![named(physical.name).with_alias(Some(alias.to_string()))]
        }
    }
}
