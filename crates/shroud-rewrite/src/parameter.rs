//! Bound parameter rewriting.

use std::collections::HashMap;

use shroud_core::EncryptRule;

use crate::generator::assignment::encrypt_value;
use crate::generator::insert::encrypted_columns;
use crate::generator::resolve::{choose_column, scope, ColumnResolver, ColumnUsage};
use crate::statement::{
    Assignment, AssignmentValue, InsertStatement, Literal, PredicateValue, SelectStatement,
    Statement, TableRef, WhereSegment,
};

/// Turns the parameters bound to the original SQL into those the rewritten
/// SQL expects.
///
/// A `?` inserted into or assigned to an encrypted column becomes one value
/// per physical column, in the order the rewritten SQL lists them. A `?` compared with
/// an encrypted column is encrypted for the physical column the predicate
/// reads. Every other parameter passes through in place.
pub struct EncryptParameterRewriter<'a> {
    rule: &'a EncryptRule,
}

impl<'a> EncryptParameterRewriter<'a> {
    pub fn new(rule: &'a EncryptRule) -> Self {
        Self { rule }
    }

    pub fn rewrite(&self, statement: &Statement, parameters: &[Literal]) -> Vec<Literal> {
        let mut replacements = HashMap::new();
        match statement {
            Statement::Insert(insert) => {
                self.insert_rows(insert, parameters, &mut replacements);
                self.assignments(
                    &insert.on_duplicate_key_update,
                    std::slice::from_ref(&insert.table),
                    parameters,
                    &mut replacements,
                );
            }
            Statement::Update(update) => {
                self.assignments(&update.assignments, &update.tables, parameters, &mut replacements);
                if let Some(where_clause) = &update.where_clause {
                    let resolver = ColumnResolver::new(&update.tables, self.rule);
                    self.segment(where_clause, &resolver, parameters, &mut replacements);
                }
            }
            Statement::Delete(delete) => {
                if let Some(where_clause) = &delete.where_clause {
                    let resolver = ColumnResolver::new(&delete.tables, self.rule);
                    self.segment(where_clause, &resolver, parameters, &mut replacements);
                }
            }
            Statement::Select(select) => self.select(select, &[], parameters, &mut replacements),
            Statement::CreateTable(_) | Statement::AlterTable(_) | Statement::Other => {}
        }

        if replacements.is_empty() {
            return parameters.to_vec();
        }
        tracing::debug!(
            original = parameters.len(),
            rewritten = replacements.len(),
            "Rewriting bound parameters"
        );

        let mut rewritten = Vec::with_capacity(parameters.len());
        for (index, parameter) in parameters.iter().enumerate() {
            match replacements.remove(&index) {
                Some(values) => rewritten.extend(values),
                None => rewritten.push(parameter.clone()),
            }
        }
        rewritten
    }

    fn insert_rows(
        &self,
        insert: &InsertStatement,
        parameters: &[Literal],
        replacements: &mut HashMap<usize, Vec<Literal>>,
    ) {
        for column in encrypted_columns(insert, self.rule) {
            if !column.rewritable {
                continue;
            }
            for row in &insert.rows {
                let Some(AssignmentValue::Parameter { index }) =
                    row.values.get(column.index).map(|value| &value.value)
                else {
                    continue;
                };
                let Some(value) = bound(parameters, *index) else {
                    continue;
                };
                let (table, encrypt_column) = (column.resolved.table, column.resolved.column);
                let values = encrypt_column
                    .physical_columns()
                    .into_iter()
                    .map(|physical| encrypt_value(table, encrypt_column, physical.role, value))
                    .collect();
                replacements.insert(*index, values);
            }
        }
    }

    fn assignments(
        &self,
        assignments: &[Assignment],
        tables: &[TableRef],
        parameters: &[Literal],
        replacements: &mut HashMap<usize, Vec<Literal>>,
    ) {
        let resolver = ColumnResolver::new(tables, self.rule);
        for assignment in assignments {
            let AssignmentValue::Parameter { index } = assignment.value else {
                continue;
            };
            let Some(resolved) = resolver.resolve(&assignment.column) else {
                continue;
            };
            let Some(value) = bound(parameters, index) else {
                continue;
            };
            let values = resolved
                .column
                .physical_columns()
                .into_iter()
                .map(|physical| encrypt_value(resolved.table, resolved.column, physical.role, value))
                .collect();
            replacements.insert(index, values);
        }
    }

    fn select(
        &self,
        select: &SelectStatement,
        outer: &[TableRef],
        parameters: &[Literal],
        replacements: &mut HashMap<usize, Vec<Literal>>,
    ) {
        let tables = scope(&select.tables, outer);
        let resolver = ColumnResolver::new(&tables, self.rule);
        let segments = select
            .where_clause
            .iter()
            .chain(&select.join_conditions)
            .chain(select.having.iter());
        for segment in segments {
            self.segment(segment, &resolver, parameters, replacements);
        }
        for subquery in &select.subqueries {
            self.select(&subquery.select, &tables, parameters, replacements);
        }
    }

    fn segment(
        &self,
        segment: &WhereSegment,
        resolver: &ColumnResolver<'_>,
        parameters: &[Literal],
        replacements: &mut HashMap<usize, Vec<Literal>>,
    ) {
        for predicate in segment.predicates() {
            let Some(resolved) = resolver.resolve(&predicate.column) else {
                continue;
            };
            let physical = choose_column(
                resolved.table,
                resolved.column,
                ColumnUsage::Predicate(predicate.operator),
            );
            for value in &predicate.values {
                let PredicateValue::Parameter { index } = *value else {
                    continue;
                };
                if let Some(parameter) = bound(parameters, index) {
                    let encrypted =
                        encrypt_value(resolved.table, resolved.column, physical.role, parameter);
                    replacements.insert(index, vec![encrypted]);
                }
            }
        }
    }
}

fn bound(parameters: &[Literal], index: usize) -> Option<&Literal> {
    let value = parameters.get(index);
    if value.is_none() {
        tracing::warn!(
            index,
            bound = parameters.len(),
            "Parameter marker has no bound value"
        );
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::{rule, rule_with_plain_reads};
    use crate::statement::{
        ColumnRef, DeleteStatement, Identifier, InsertRow, InsertValue, Predicate,
        PredicateOperator, Span, Subquery, SubqueryKind, UpdateStatement,
    };
    use pretty_assertions::assert_eq;

    fn name(value: &str) -> Identifier {
        Identifier::new(value, Span::at(0))
    }

    fn column(value: &str) -> ColumnRef {
        ColumnRef::new(name(value))
    }

    fn string(value: &str) -> Literal {
        Literal::String(value.to_string())
    }

    fn parameter_assignment(target: &str, index: usize) -> Assignment {
        Assignment {
            column: column(target),
            value: AssignmentValue::Parameter { index },
            span: Span::at(0),
        }
    }

    fn parameter_predicate(target: &str, operator: PredicateOperator, index: usize) -> Predicate {
        Predicate::new(column(target), operator).with_value(PredicateValue::Parameter { index })
    }

    #[test]
    fn test_on_duplicate_parameter_fans_out() {
        // INSERT INTO t_user (id, email) VALUES (?, ?) ON DUPLICATE KEY UPDATE email = ?, status = ?
        let statement = Statement::Insert(InsertStatement {
            table: TableRef::new(name("t_user")),
            columns: Vec::new(),
            rows: Vec::new(),
            on_duplicate_key_update: vec![
                parameter_assignment("email", 2),
                parameter_assignment("status", 3),
            ],
        });
        let parameters = vec![
            Literal::Number("1".into()),
            string("a@b"),
            string("c@d"),
            Literal::Number("0".into()),
        ];

        let rule = rule();
        assert_eq!(
            EncryptParameterRewriter::new(&rule).rewrite(&statement, &parameters),
            vec![
                Literal::Number("1".into()),
                string("a@b"),
                string("aes(c@d)"),
                string("md5(c@d)"),
                string("c@d"),
                Literal::Number("0".into()),
            ]
        );
    }

    #[test]
    fn test_insert_rows_fan_out() {
        // INSERT INTO t_user (id, pwd) VALUES (?, ?), (?, ?)
        let value = |index| InsertValue {
            value: AssignmentValue::Parameter { index },
            span: Span::at(0),
        };
        let mut insert = InsertStatement::new(TableRef::new(name("t_user")));
        insert.columns = vec![column("id"), column("pwd")];
        insert.rows = vec![
            InsertRow {
                values: vec![value(0), value(1)],
            },
            InsertRow {
                values: vec![value(2), value(3)],
            },
        ];
        let parameters = vec![
            Literal::Number("1".into()),
            string("a"),
            Literal::Number("2".into()),
            Literal::Null,
        ];

        let rule = rule();
        assert_eq!(
            EncryptParameterRewriter::new(&rule).rewrite(&Statement::Insert(insert), &parameters),
            vec![
                Literal::Number("1".into()),
                string("aes(a)"),
                string("md5(a)"),
                Literal::Number("2".into()),
                Literal::Null,
                Literal::Null,
            ]
        );
    }

    #[test]
    fn test_update_set_and_where() {
        // UPDATE t_user SET pwd = ? WHERE user_id = ? AND status = ?
        let statement = Statement::Update(UpdateStatement {
            tables: vec![TableRef::new(name("t_user"))],
            assignments: vec![parameter_assignment("pwd", 0)],
            where_clause: Some(WhereSegment::all(vec![
                parameter_predicate("user_id", PredicateOperator::Equal, 1),
                parameter_predicate("status", PredicateOperator::Equal, 2),
            ])),
        });
        let parameters = vec![string("secret"), string("u1"), Literal::Number("1".into())];

        let rule = rule();
        assert_eq!(
            EncryptParameterRewriter::new(&rule).rewrite(&statement, &parameters),
            vec![
                string("aes(secret)"),
                string("md5(secret)"),
                string("md5(u1)"),
                Literal::Number("1".into()),
            ]
        );
    }

    #[test]
    fn test_predicate_role_follows_operator_and_policy() {
        // SELECT id FROM t_user WHERE user_id LIKE ? AND email = ? AND pwd > ?
        let select = SelectStatement {
            tables: vec![TableRef::new(name("t_user"))],
            where_clause: Some(WhereSegment::all(vec![
                parameter_predicate("user_id", PredicateOperator::Like, 0),
                parameter_predicate("email", PredicateOperator::Equal, 1),
                parameter_predicate("pwd", PredicateOperator::Comparison, 2),
            ])),
            ..Default::default()
        };
        let statement = Statement::Select(select);
        let parameters = vec![string("u%"), string("e"), string("p")];

        let rule = rule();
        assert_eq!(
            EncryptParameterRewriter::new(&rule).rewrite(&statement, &parameters),
            vec![string("like(u%)"), string("md5(e)"), string("aes(p)")]
        );

        let plain = rule_with_plain_reads();
        assert_eq!(
            EncryptParameterRewriter::new(&plain).rewrite(&statement, &parameters),
            vec![string("u%"), string("e"), string("aes(p)")]
        );
    }

    #[test]
    fn test_subquery_and_delete_parameters() {
        // SELECT id FROM t_order WHERE id IN (SELECT id FROM t_user WHERE pwd = ?)
        let inner = SelectStatement {
            tables: vec![TableRef::new(name("t_user"))],
            where_clause: Some(WhereSegment::all(vec![parameter_predicate(
                "pwd",
                PredicateOperator::Equal,
                0,
            )])),
            ..Default::default()
        };
        let select = Statement::Select(SelectStatement {
            tables: vec![TableRef::new(name("t_order"))],
            subqueries: vec![Subquery::new(SubqueryKind::Predicate, inner)],
            ..Default::default()
        });
        let rule = rule();
        let rewriter = EncryptParameterRewriter::new(&rule);
        assert_eq!(rewriter.rewrite(&select, &[string("x")]), vec![string("md5(x)")]);

        // DELETE FROM t_order WHERE amount = ?
        let delete = Statement::Delete(DeleteStatement {
            tables: vec![TableRef::new(name("t_order"))],
            where_clause: Some(WhereSegment::all(vec![parameter_predicate(
                "amount",
                PredicateOperator::Equal,
                0,
            )])),
        });
        assert_eq!(
            rewriter.rewrite(&delete, &[Literal::Number("10".into())]),
            vec![string("aes(10)")]
        );
    }

    #[test]
    fn test_unencrypted_and_missing_parameters_pass_through() {
        let statement = Statement::Update(UpdateStatement {
            tables: vec![TableRef::new(name("t_item"))],
            assignments: vec![parameter_assignment("pwd", 0)],
            where_clause: None,
        });
        let rule = rule();
        let rewriter = EncryptParameterRewriter::new(&rule);
        assert_eq!(rewriter.rewrite(&statement, &[string("x")]), vec![string("x")]);

        let statement = Statement::Update(UpdateStatement {
            tables: vec![TableRef::new(name("t_user"))],
            assignments: vec![parameter_assignment("pwd", 5)],
            where_clause: None,
        });
        assert_eq!(rewriter.rewrite(&statement, &[string("x")]), vec![string("x")]);
    }

    #[test]
    fn test_null_parameter_stays_null() {
        let statement = Statement::Update(UpdateStatement {
            tables: vec![TableRef::new(name("t_user"))],
            assignments: vec![parameter_assignment("pwd", 0)],
            where_clause: None,
        });
        let rule = rule();
        assert_eq!(
            EncryptParameterRewriter::new(&rule).rewrite(&statement, &[Literal::Null]),
            vec![Literal::Null, Literal::Null]
        );
    }
}
