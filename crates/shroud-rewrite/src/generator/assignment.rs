//! Assignments in `INSERT ... ON DUPLICATE KEY UPDATE` and `UPDATE ... SET`.
//!
//! An assignment to an encrypted column becomes one assignment per physical
//! column, in role order. What each one assigns depends on the right-hand
//! side:
//!
//! - `?` stays a marker per physical column; the parameter rewriter supplies
//!   the values.
//! - A literal is encrypted now with each role's encryptor; the plain column
//!   keeps the literal as written.
//! - `VALUES(src)` maps role to role and needs `src` to be encrypted too.

use shroud_core::{ColumnRole, EncryptColumn, EncryptRule, EncryptTable};

use crate::buffer::TokenBuffer;
use crate::statement::{Assignment, AssignmentValue, InsertStatement, Literal, UpdateStatement};
use crate::token::{AssignmentPair, AssignmentTokenValue, SqlToken};

use super::resolve::ColumnResolver;

pub fn generate_on_duplicate(
    statement: &InsertStatement,
    rule: &EncryptRule,
    tokens: &mut TokenBuffer,
) {
    let tables = std::slice::from_ref(&statement.table);
    generate_assignments(&statement.on_duplicate_key_update, ColumnResolver::new(tables, rule), tokens);
}

pub fn generate_set(statement: &UpdateStatement, rule: &EncryptRule, tokens: &mut TokenBuffer) {
    generate_assignments(
        &statement.assignments,
        ColumnResolver::new(&statement.tables, rule),
        tokens,
    );
}

fn generate_assignments(
    assignments: &[Assignment],
    resolver: ColumnResolver<'_>,
    tokens: &mut TokenBuffer,
) {
    for assignment in assignments {
        let Some(resolved) = resolver.resolve(&assignment.column) else {
            continue;
        };
        if let Some(token) = assignment_token(resolved.table, resolved.column, assignment) {
            tokens.push(token);
        }
    }
}

fn assignment_token(
    table: &EncryptTable,
    column: &EncryptColumn,
    assignment: &Assignment,
) -> Option<SqlToken> {
    let owner = assignment.column.owner.as_ref().map(|o| o.value.clone());
    let quote = assignment.column.name.quote;
    let pair = |name: &str, value| AssignmentPair {
        owner: owner.clone(),
        column: name.to_string(),
        quote,
        value,
    };

    let pairs: Vec<AssignmentPair> = match &assignment.value {
        AssignmentValue::Parameter { .. } => column
            .physical_columns()
            .into_iter()
            .map(|physical| pair(physical.name, AssignmentTokenValue::Parameter))
            .collect(),
        AssignmentValue::Literal(literal) => column
            .physical_columns()
            .into_iter()
            .map(|physical| {
                let value = encrypt_value(table, column, physical.role, literal);
                pair(physical.name, AssignmentTokenValue::Literal(value))
            })
            .collect(),
        AssignmentValue::Values(source) => {
            let Some(source_column) = table.find_encrypt_column(&source.name.value) else {
                tracing::warn!(
                    table = table.name(),
                    column = column.logical_name(),
                    source = source.name.value.as_str(),
                    "VALUES() source is not encrypted, assignment left unchanged"
                );
                return None;
            };
            column
                .physical_columns()
                .into_iter()
                .filter_map(|physical| {
                    source_column.role_name(physical.role).map(|source_name| {
                        pair(physical.name, AssignmentTokenValue::Values(source_name.to_string()))
                    })
                })
                .collect()
        }
        AssignmentValue::Expression => {
            tracing::warn!(
                table = table.name(),
                column = column.logical_name(),
                "Expression assigned to encrypted column, assignment left unchanged"
            );
            return None;
        }
    };

    tracing::debug!(
        table = table.name(),
        column = column.logical_name(),
        physical_columns = pairs.len(),
        "Rewriting assignment"
    );
    Some(SqlToken::assignment(assignment.span, pairs))
}

/// Value stored in the `role` column for a logical `value`.
///
/// NULL stays NULL and the plain column stores the value unchanged.
pub(crate) fn encrypt_value(
    table: &EncryptTable,
    column: &EncryptColumn,
    role: ColumnRole,
    value: &Literal,
) -> Literal {
    let item = match role {
        ColumnRole::Plain => return value.clone(),
        ColumnRole::Cipher => Some(column.cipher()),
        ColumnRole::AssistedQuery => column.assisted_query(),
        ColumnRole::LikeQuery => column.like_query(),
    };
    match (item, value.plaintext()) {
        (Some(item), Some(plaintext)) => Literal::String(item.encryptor().encrypt(
            table.name(),
            column.logical_name(),
            &plaintext,
        )),
        (_, None) => Literal::Null,
        (None, Some(_)) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SqlBuilder;
    use crate::generator::tests::rule;
    use crate::statement::{Span, TableRef};
    use crate::test_support::{column, column_nth, ident, span, table};
    use pretty_assertions::assert_eq;

    fn assignment(sql: &str, text: &str, target: &str, value: AssignmentValue) -> Assignment {
        let whole = span(sql, text);
        let mut target = column(&sql[whole.start..], target);
        target.name.span = Span::new(
            whole.start + target.name.span.start,
            whole.start + target.name.span.end,
        );
        if let Some(owner) = &mut target.owner {
            owner.span = Span::new(whole.start + owner.span.start, whole.start + owner.span.end);
        }
        Assignment {
            column: target,
            value,
            span: whole,
        }
    }

    fn rewrite_insert(sql: &str, statement: &InsertStatement) -> (Vec<SqlToken>, String) {
        let mut tokens = TokenBuffer::new();
        generate_on_duplicate(statement, &rule(), &mut tokens);
        let rewritten = SqlBuilder::new(sql, tokens.tokens()).to_sql().unwrap();
        (tokens.into_tokens(), rewritten)
    }

    #[test]
    fn test_parameter_fan_out_in_role_order() {
        let sql = "INSERT INTO t_user (id, email) VALUES (?, ?) ON DUPLICATE KEY UPDATE email = ?";
        let statement = InsertStatement {
            table: table(sql, "t_user"),
            columns: Vec::new(),
            rows: Vec::new(),
            on_duplicate_key_update: vec![assignment(
                sql,
                "email = ?",
                "email",
                AssignmentValue::Parameter { index: 2 },
            )],
        };

        let (tokens, rewritten) = rewrite_insert(sql, &statement);
        assert_eq!(tokens.len(), 1);
        assert_eq!(
            tokens[0].column_names(),
            vec!["email_cipher", "email_assisted", "email_plain"]
        );
        assert_eq!(
            rewritten,
            "INSERT INTO t_user (id, email) VALUES (?, ?) ON DUPLICATE KEY UPDATE \
             email_cipher = ?, email_assisted = ?, email_plain = ?"
        );
    }

    #[test]
    fn test_literal_is_encrypted_per_role() {
        let sql = "INSERT INTO t_user (id) VALUES (1) ON DUPLICATE KEY UPDATE user_id = 'u1', status = 2";
        let statement = InsertStatement {
            table: table(sql, "t_user"),
            columns: Vec::new(),
            rows: Vec::new(),
            on_duplicate_key_update: vec![
                assignment(
                    sql,
                    "user_id = 'u1'",
                    "user_id",
                    AssignmentValue::Literal(Literal::String("u1".into())),
                ),
                assignment(
                    sql,
                    "status = 2",
                    "status",
                    AssignmentValue::Literal(Literal::Number("2".into())),
                ),
            ],
        };

        let (tokens, rewritten) = rewrite_insert(sql, &statement);
        assert_eq!(tokens.len(), 1);
        assert_eq!(
            rewritten,
            "INSERT INTO t_user (id) VALUES (1) ON DUPLICATE KEY UPDATE \
             user_id_cipher = 'aes(u1)', user_id_assisted = 'md5(u1)', \
             user_id_like = 'like(u1)', user_id_plain = 'u1', status = 2"
        );
    }

    #[test]
    fn test_values_reference_maps_shared_roles() {
        let sql = "INSERT INTO t_user (pwd, user_id) VALUES (?, ?) \
                   ON DUPLICATE KEY UPDATE pwd = VALUES(user_id), user_id = VALUES(user_id)";
        let statement = InsertStatement {
            table: table(sql, "t_user"),
            columns: Vec::new(),
            rows: Vec::new(),
            on_duplicate_key_update: vec![
                assignment(
                    sql,
                    "pwd = VALUES(user_id)",
                    "pwd",
                    AssignmentValue::Values(column_nth(sql, "user_id", 1)),
                ),
                assignment(
                    sql,
                    "user_id = VALUES(user_id)",
                    "user_id",
                    AssignmentValue::Values(column_nth(sql, "user_id", 3)),
                ),
            ],
        };

        let (_, rewritten) = rewrite_insert(sql, &statement);
        assert_eq!(
            rewritten,
            "INSERT INTO t_user (pwd, user_id) VALUES (?, ?) ON DUPLICATE KEY UPDATE \
             pwd_cipher = VALUES(user_id_cipher), pwd_assisted = VALUES(user_id_assisted), \
             user_id_cipher = VALUES(user_id_cipher), user_id_assisted = VALUES(user_id_assisted), \
             user_id_like = VALUES(user_id_like), user_id_plain = VALUES(user_id_plain)"
        );
    }

    #[test]
    fn test_unrewritable_right_hand_sides_are_skipped() {
        let sql = "INSERT INTO t_user (id) VALUES (1) ON DUPLICATE KEY UPDATE pwd = VALUES(id), user_id = user_id + 1";
        let statement = InsertStatement {
            table: table(sql, "t_user"),
            columns: Vec::new(),
            rows: Vec::new(),
            on_duplicate_key_update: vec![
                assignment(
                    sql,
                    "pwd = VALUES(id)",
                    "pwd",
                    AssignmentValue::Values(column_nth(sql, "id", 1)),
                ),
                assignment(sql, "user_id = user_id + 1", "user_id", AssignmentValue::Expression),
            ],
        };

        let (tokens, rewritten) = rewrite_insert(sql, &statement);
        assert!(tokens.is_empty());
        assert_eq!(rewritten, sql);
    }

    #[test]
    fn test_update_set_with_alias_and_null() {
        let sql = "UPDATE t_user u SET u.pwd = NULL, u.status = ? WHERE u.id = ?";
        let statement = UpdateStatement {
            tables: vec![TableRef::new(ident(sql, "t_user")).with_alias(ident(sql, "u"))],
            assignments: vec![
                assignment(sql, "u.pwd = NULL", "u.pwd", AssignmentValue::Literal(Literal::Null)),
                assignment(
                    sql,
                    "u.status = ?",
                    "u.status",
                    AssignmentValue::Parameter { index: 0 },
                ),
            ],
            where_clause: None,
        };

        let mut tokens = TokenBuffer::new();
        generate_set(&statement, &rule(), &mut tokens);
        assert_eq!(
            SqlBuilder::new(sql, tokens.tokens()).to_sql().unwrap(),
            "UPDATE t_user u SET u.pwd_cipher = NULL, u.pwd_assisted = NULL, u.status = ? WHERE u.id = ?"
        );
    }

    #[test]
    fn test_unencrypted_table_has_no_tokens() {
        let sql = "INSERT INTO t_item (pwd) VALUES (?) ON DUPLICATE KEY UPDATE pwd = ?";
        let statement = InsertStatement {
            table: table(sql, "t_item"),
            columns: Vec::new(),
            rows: Vec::new(),
            on_duplicate_key_update: vec![assignment(
                sql,
                "pwd = ?",
                "pwd",
                AssignmentValue::Parameter { index: 1 },
            )],
        };
        let (tokens, _) = rewrite_insert(sql, &statement);
        assert!(tokens.is_empty());
    }
}
