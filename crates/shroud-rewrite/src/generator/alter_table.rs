//! `ALTER TABLE ... ADD/MODIFY/CHANGE/DROP COLUMN`.
//!
//! The clause's column name becomes the cipher column. Every other physical
//! column is appended after the clause as another clause of the same kind.
//! `CHANGE COLUMN` renames role to role and requires both columns to share
//! their encryption settings.

use std::sync::Arc;

use shroud_core::{ColumnItem, EncryptColumn, EncryptRule, EncryptTable};

use crate::buffer::TokenBuffer;
use crate::error::RewriteError;
use crate::statement::{
    AlterClause, AlterTableStatement, ChangeColumnClause, ColumnDefinitionClause, ColumnPosition,
    DropColumnClause, Span,
};
use crate::token::{Splice, SqlToken, SubstituteProjection};

const ADD_COLUMN: &str = ", ADD COLUMN";
const MODIFY_COLUMN: &str = ", MODIFY COLUMN";
const CHANGE_COLUMN: &str = ", CHANGE COLUMN";
const DROP_COLUMN: &str = ", DROP COLUMN";

/// Fails with [`RewriteError::EncryptColumnAlter`] when a `CHANGE COLUMN`
/// crosses encryption settings.
pub fn generate(
    statement: &AlterTableStatement,
    rule: &EncryptRule,
    tokens: &mut TokenBuffer,
) -> Result<(), RewriteError> {
    let Some(table) = rule.find_table(&statement.table.name.value) else {
        return Ok(());
    };

    for clause in &statement.clauses {
        match clause {
            AlterClause::Add(add) => generate_definition(table, add, ADD_COLUMN, tokens),
            AlterClause::Modify(modify) => generate_definition(table, modify, MODIFY_COLUMN, tokens),
            AlterClause::Change(change) => generate_change(table, change, tokens)?,
            AlterClause::Drop(drop) => generate_drop(table, drop, tokens),
        }
    }
    Ok(())
}

fn position_token(table: &EncryptTable, position: Option<&ColumnPosition>, tokens: &mut TokenBuffer) {
    if let Some(ColumnPosition::After(after)) = position {
        if let Some(cipher) = table.cipher_column(&after.value) {
            tokens.push(SqlToken::substitute(
                after.span,
                vec![SubstituteProjection::new(cipher, after.quote)],
                Splice::InPlace,
            ));
        }
    }
}

fn generate_definition(
    table: &EncryptTable,
    clause: &ColumnDefinitionClause,
    label: &'static str,
    tokens: &mut TokenBuffer,
) {
    position_token(table, clause.position.as_ref(), tokens);

    let name = &clause.definition.name;
    let Some(column) = table.find_encrypt_column(&name.value) else {
        return;
    };

    tracing::debug!(
        table = table.name(),
        column = column.logical_name(),
        clause = label.trim_start_matches(", "),
        "Rewriting ALTER TABLE clause"
    );
    let mut physical = column.physical_columns().into_iter();
    if let Some(cipher) = physical.next() {
        tokens.push(SqlToken::substitute(
            name.span,
            vec![SubstituteProjection::new(cipher.name, name.quote)],
            Splice::InPlace,
        ));
    }
    for extra in physical {
        tokens.push(
            SqlToken::substitute(
                Span::at(clause.span.end),
                vec![SubstituteProjection::new(extra.name, name.quote)],
                Splice::Clause(label),
            )
            .with_definition(clause.definition.definition_span()),
        );
    }
}

fn generate_change(
    table: &EncryptTable,
    clause: &ChangeColumnClause,
    tokens: &mut TokenBuffer,
) -> Result<(), RewriteError> {
    position_token(table, clause.position.as_ref(), tokens);

    let previous = &clause.previous;
    let name = &clause.definition.name;
    let alter_error = || RewriteError::EncryptColumnAlter {
        table: table.name().to_string(),
        column: name.value.clone(),
        previous: previous.value.clone(),
    };
    let (previous_column, column) = match (
        table.find_encrypt_column(&previous.value),
        table.find_encrypt_column(&name.value),
    ) {
        (None, None) => return Ok(()),
        (Some(previous_column), Some(column)) if same_encryption(previous_column, column) => {
            (previous_column, column)
        }
        _ => return Err(alter_error()),
    };

    tracing::debug!(
        table = table.name(),
        previous = previous_column.logical_name(),
        column = column.logical_name(),
        "Rewriting ALTER TABLE CHANGE COLUMN"
    );
    let mut pairs = previous_column
        .physical_columns()
        .into_iter()
        .zip(column.physical_columns());
    if let Some((previous_cipher, cipher)) = pairs.next() {
        tokens.push(SqlToken::substitute(
            previous.span,
            vec![SubstituteProjection::new(previous_cipher.name, previous.quote)],
            Splice::InPlace,
        ));
        tokens.push(SqlToken::substitute(
            name.span,
            vec![SubstituteProjection::new(cipher.name, name.quote)],
            Splice::InPlace,
        ));
    }
    for (previous_extra, extra) in pairs {
        tokens.push(
            SqlToken::substitute(
                Span::at(clause.span.end),
                vec![SubstituteProjection::new(extra.name, name.quote)
                    .with_previous(previous_extra.name)],
                Splice::Clause(CHANGE_COLUMN),
            )
            .with_definition(clause.definition.definition_span()),
        );
    }
    Ok(())
}

/// Same physical roles, each written by the same encryptor.
fn same_encryption(previous: &EncryptColumn, column: &EncryptColumn) -> bool {
    let same_item = |a: Option<&ColumnItem>, b: Option<&ColumnItem>| match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a.encryptor(), b.encryptor()),
        (None, None) => true,
        _ => false,
    };
    same_item(Some(previous.cipher()), Some(column.cipher()))
        && same_item(previous.assisted_query(), column.assisted_query())
        && same_item(previous.like_query(), column.like_query())
        && previous.plain().is_some() == column.plain().is_some()
}

fn generate_drop(table: &EncryptTable, clause: &DropColumnClause, tokens: &mut TokenBuffer) {
    let name = &clause.column;
    let Some(column) = table.find_encrypt_column(&name.value) else {
        return;
    };

    tracing::debug!(
        table = table.name(),
        column = column.logical_name(),
        "Rewriting ALTER TABLE DROP COLUMN"
    );
    let mut physical = column.physical_columns().into_iter();
    if let Some(cipher) = physical.next() {
        tokens.push(SqlToken::substitute(
            name.span,
            vec![SubstituteProjection::new(cipher.name, name.quote)],
            Splice::InPlace,
        ));
    }
    for extra in physical {
        tokens.push(SqlToken::substitute(
            Span::at(clause.span.end),
            vec![SubstituteProjection::new(extra.name, name.quote)],
            Splice::Clause(DROP_COLUMN),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SqlBuilder;
    use crate::generator::tests::{rule, Tagged};
    use crate::statement::{ColumnDefinition, Identifier};
    use crate::test_support::{definition, ident, ident_nth, span, table};
    use pretty_assertions::assert_eq;
    use shroud_core::{
        EncryptColumnConfig, EncryptRuleConfig, EncryptTableConfig, EncryptorRegistry,
    };

    /// `t_user` with `old_pwd` and `pwd` sharing their settings.
    fn rename_rule() -> EncryptRule {
        let registry = EncryptorRegistry::new()
            .register("aes", Tagged("aes"))
            .register("md5", Tagged("md5"));
        let column = |cipher: &str, assisted: &str| {
            EncryptColumnConfig::new(cipher, "aes").with_assisted_query(assisted, "md5")
        };
        let config = EncryptRuleConfig::default().with_table(
            "t_user",
            EncryptTableConfig::default()
                .with_column("old_pwd", column("old_pwd_cipher", "old_pwd_assisted"))
                .with_column("pwd", column("pwd_cipher", "pwd_assisted")),
        );
        EncryptRule::from_config(&config, &registry).unwrap()
    }

    fn change(
        sql: &str,
        whole: &str,
        previous: Identifier,
        definition: ColumnDefinition,
    ) -> AlterTableStatement {
        AlterTableStatement {
            table: table(sql, "t_user"),
            clauses: vec![AlterClause::Change(ChangeColumnClause {
                previous,
                definition,
                position: None,
                span: span(sql, whole),
            })],
        }
    }

    fn rewrite(sql: &str, statement: &AlterTableStatement) -> String {
        let mut tokens = TokenBuffer::new();
        generate(statement, &rule(), &mut tokens).unwrap();
        SqlBuilder::new(sql, tokens.tokens()).to_sql().unwrap()
    }

    fn clause(
        sql: &str,
        whole: &str,
        definition: ColumnDefinition,
        position: Option<ColumnPosition>,
    ) -> ColumnDefinitionClause {
        ColumnDefinitionClause {
            definition,
            position,
            span: span(sql, whole),
        }
    }

    #[test]
    fn test_add_drop_and_modify() {
        let sql = "ALTER TABLE t_user ADD COLUMN user_id VARCHAR(20) NOT NULL AFTER pwd, \
                   DROP COLUMN pwd, MODIFY COLUMN status INT";
        let statement = AlterTableStatement {
            table: table(sql, "t_user"),
            clauses: vec![
                AlterClause::Add(clause(
                    sql,
                    "ADD COLUMN user_id VARCHAR(20) NOT NULL AFTER pwd",
                    definition(sql, "user_id", " VARCHAR(20) NOT NULL"),
                    Some(ColumnPosition::After(ident(sql, "pwd"))),
                )),
                AlterClause::Drop(DropColumnClause {
                    column: ident_nth(sql, "pwd", 1),
                    span: span(sql, "DROP COLUMN pwd"),
                }),
                AlterClause::Modify(clause(
                    sql,
                    "MODIFY COLUMN status INT",
                    definition(sql, "status", " INT"),
                    None,
                )),
            ],
        };

        assert_eq!(
            rewrite(sql, &statement),
            "ALTER TABLE t_user ADD COLUMN user_id_cipher VARCHAR(20) NOT NULL AFTER pwd_cipher, \
             ADD COLUMN user_id_assisted VARCHAR(20) NOT NULL, \
             ADD COLUMN user_id_like VARCHAR(20) NOT NULL, \
             ADD COLUMN user_id_plain VARCHAR(20) NOT NULL, \
             DROP COLUMN pwd_cipher, DROP COLUMN pwd_assisted, MODIFY COLUMN status INT"
        );
    }

    #[test]
    fn test_modify_keeps_type_for_every_role() {
        let sql = "ALTER TABLE t_user MODIFY COLUMN email VARCHAR(128) DEFAULT ''";
        let statement = AlterTableStatement {
            table: table(sql, "t_user"),
            clauses: vec![AlterClause::Modify(clause(
                sql,
                "MODIFY COLUMN email VARCHAR(128) DEFAULT ''",
                definition(sql, "email", " VARCHAR(128) DEFAULT ''"),
                None,
            ))],
        };

        assert_eq!(
            rewrite(sql, &statement),
            "ALTER TABLE t_user MODIFY COLUMN email_cipher VARCHAR(128) DEFAULT '', \
             MODIFY COLUMN email_assisted VARCHAR(128) DEFAULT '', \
             MODIFY COLUMN email_plain VARCHAR(128) DEFAULT ''"
        );
    }

    #[test]
    fn test_change_renames_role_to_role() {
        let sql = "ALTER TABLE t_user CHANGE COLUMN old_pwd pwd VARCHAR(64) NOT NULL AFTER old_pwd";
        let mut statement = change(
            sql,
            "CHANGE COLUMN old_pwd pwd VARCHAR(64) NOT NULL AFTER old_pwd",
            ident(sql, "old_pwd"),
            definition(sql, "pwd", " VARCHAR(64) NOT NULL"),
        );
        if let AlterClause::Change(clause) = &mut statement.clauses[0] {
            clause.position = Some(ColumnPosition::After(ident_nth(sql, "old_pwd", 1)));
        }

        let mut tokens = TokenBuffer::new();
        generate(&statement, &rename_rule(), &mut tokens).unwrap();
        assert_eq!(
            SqlBuilder::new(sql, tokens.tokens()).to_sql().unwrap(),
            "ALTER TABLE t_user CHANGE COLUMN old_pwd_cipher pwd_cipher VARCHAR(64) NOT NULL \
             AFTER old_pwd_cipher, CHANGE COLUMN old_pwd_assisted pwd_assisted VARCHAR(64) NOT NULL"
        );
    }

    #[test]
    fn test_change_across_encryption_settings_fails() {
        let sql = "ALTER TABLE t_user CHANGE COLUMN pwd user_id VARCHAR(64)";
        let statement = change(
            sql,
            "CHANGE COLUMN pwd user_id VARCHAR(64)",
            ident(sql, "pwd"),
            definition(sql, "user_id", " VARCHAR(64)"),
        );
        let err = generate(&statement, &rule(), &mut TokenBuffer::new()).unwrap_err();
        assert!(matches!(
            err,
            RewriteError::EncryptColumnAlter { ref table, ref column, ref previous }
                if table == "t_user" && column == "user_id" && previous == "pwd"
        ));

        let sql = "ALTER TABLE t_user CHANGE COLUMN pwd secret TEXT";
        let statement = change(
            sql,
            "CHANGE COLUMN pwd secret TEXT",
            ident(sql, "pwd"),
            definition(sql, "secret", " TEXT"),
        );
        assert!(matches!(
            generate(&statement, &rule(), &mut TokenBuffer::new()),
            Err(RewriteError::EncryptColumnAlter { .. })
        ));
    }

    #[test]
    fn test_change_between_plain_columns_is_untouched() {
        let sql = "ALTER TABLE t_user CHANGE COLUMN nick nickname VARCHAR(32)";
        let statement = change(
            sql,
            "CHANGE COLUMN nick nickname VARCHAR(32)",
            ident(sql, "nick"),
            definition(sql, "nickname", " VARCHAR(32)"),
        );
        assert_eq!(rewrite(sql, &statement), sql);
    }

    #[test]
    fn test_unencrypted_table_round_trips() {
        let sql = "ALTER TABLE t_item ADD COLUMN pwd VARCHAR(20) AFTER id, \
                   MODIFY COLUMN user_id INT, DROP COLUMN email";
        let statement = AlterTableStatement {
            table: table(sql, "t_item"),
            clauses: vec![
                AlterClause::Add(clause(
                    sql,
                    "ADD COLUMN pwd VARCHAR(20) AFTER id",
                    definition(sql, "pwd", " VARCHAR(20)"),
                    Some(ColumnPosition::After(ident(sql, "id"))),
                )),
                AlterClause::Modify(clause(
                    sql,
                    "MODIFY COLUMN user_id INT",
                    definition(sql, "user_id", " INT"),
                    None,
                )),
                AlterClause::Drop(DropColumnClause {
                    column: ident(sql, "email"),
                    span: span(sql, "DROP COLUMN email"),
                }),
            ],
        };
        let mut tokens = TokenBuffer::new();
        generate(&statement, &rule(), &mut tokens).unwrap();
        assert!(tokens.is_empty());
        assert_eq!(SqlBuilder::new(sql, tokens.tokens()).to_sql().unwrap(), sql);
    }

    #[test]
    fn test_cipher_only_drop_has_single_token() {
        let sql = "ALTER TABLE t_order DROP COLUMN amount";
        let statement = AlterTableStatement {
            table: table(sql, "t_order"),
            clauses: vec![AlterClause::Drop(DropColumnClause {
                column: ident(sql, "amount"),
                span: span(sql, "DROP COLUMN amount"),
            })],
        };
        let mut tokens = TokenBuffer::new();
        generate(&statement, &rule(), &mut tokens).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens.tokens()[0].column_names(), vec!["amount_cipher"]);
    }
}
