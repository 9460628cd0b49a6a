//! `CREATE TABLE` column definitions.
//!
//! An encrypted definition is removed together with the separator that
//! follows it, then one definition per physical column is inserted at the
//! same boundary, each reusing the original type and constraint text.

use shroud_core::EncryptRule;

use crate::buffer::TokenBuffer;
use crate::statement::{CreateTableStatement, Span};
use crate::token::{Splice, SqlToken, SubstituteProjection};

pub fn generate(statement: &CreateTableStatement, rule: &EncryptRule, tokens: &mut TokenBuffer) {
    let Some(table) = rule.find_table(&statement.table.name.value) else {
        return;
    };

    let definitions = &statement.columns;
    for (idx, definition) in definitions.iter().enumerate() {
        let Some(column) = table.find_encrypt_column(&definition.name.value) else {
            continue;
        };

        let last_column = idx + 1 == definitions.len();
        let boundary = definitions
            .get(idx + 1)
            .map_or(definition.span.end, |next| next.span.start);
        tokens.push(SqlToken::remove(Span::new(definition.span.start, boundary)));

        for (role_idx, physical) in column.physical_columns().into_iter().enumerate() {
            let splice = if role_idx == 0 && last_column {
                Splice::InPlace
            } else {
                Splice::Column { last_column }
            };
            tracing::debug!(
                table = table.name(),
                column = column.logical_name(),
                physical = physical.name,
                role = %physical.role,
                "Rewriting column definition"
            );
            tokens.push(
                SqlToken::substitute(
                    Span::at(boundary),
                    vec![SubstituteProjection::new(physical.name, definition.name.quote)],
                    splice,
                )
                .with_definition(definition.definition_span()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SqlBuilder;
    use crate::generator::tests::rule;
    use crate::test_support::{definition, table};
    use pretty_assertions::assert_eq;

    fn rewrite(sql: &str, statement: &CreateTableStatement) -> String {
        let mut tokens = TokenBuffer::new();
        generate(statement, &rule(), &mut tokens);
        SqlBuilder::new(sql, tokens.tokens()).to_sql().unwrap()
    }

    #[test]
    fn test_encrypted_column_in_the_middle() {
        let sql = "CREATE TABLE t_user (id INT NOT NULL, pwd VARCHAR(64) NOT NULL COMMENT 'a, b', status INT)";
        let statement = CreateTableStatement {
            table: table(sql, "t_user"),
            columns: vec![
                definition(sql, "id", " INT NOT NULL"),
                definition(sql, "pwd", " VARCHAR(64) NOT NULL COMMENT 'a, b'"),
                definition(sql, "status", " INT"),
            ],
        };
        assert_eq!(
            rewrite(sql, &statement),
            "CREATE TABLE t_user (id INT NOT NULL, \
             pwd_cipher VARCHAR(64) NOT NULL COMMENT 'a, b', \
             pwd_assisted VARCHAR(64) NOT NULL COMMENT 'a, b', status INT)"
        );
    }

    #[test]
    fn test_encrypted_last_column_with_every_role() {
        let sql = "CREATE TABLE t_user (id INT, user_id VARCHAR(20), PRIMARY KEY (id))";
        let statement = CreateTableStatement {
            table: table(sql, "t_user"),
            columns: vec![
                definition(sql, "id", " INT"),
                definition(sql, "user_id", " VARCHAR(20)"),
            ],
        };
        assert_eq!(
            rewrite(sql, &statement),
            "CREATE TABLE t_user (id INT, user_id_cipher VARCHAR(20), \
             user_id_assisted VARCHAR(20), user_id_like VARCHAR(20), \
             user_id_plain VARCHAR(20), PRIMARY KEY (id))"
        );
    }

    #[test]
    fn test_adjacent_encrypted_columns_keep_quotes() {
        let sql = "CREATE TABLE t_user (`pwd` TEXT, `user_id` INT)";
        let statement = CreateTableStatement {
            table: table(sql, "t_user"),
            columns: vec![
                definition(sql, "`pwd`", " TEXT"),
                definition(sql, "`user_id`", " INT"),
            ],
        };
        assert_eq!(
            rewrite(sql, &statement),
            "CREATE TABLE t_user (`pwd_cipher` TEXT, `pwd_assisted` TEXT, \
             `user_id_cipher` INT, `user_id_assisted` INT, `user_id_like` INT, `user_id_plain` INT)"
        );
    }

    #[test]
    fn test_unencrypted_table_has_no_tokens() {
        let sql = "CREATE TABLE t_item (pwd TEXT)";
        let statement = CreateTableStatement {
            table: table(sql, "t_item"),
            columns: vec![definition(sql, "pwd", " TEXT")],
        };
        let mut tokens = TokenBuffer::new();
        generate(&statement, &rule(), &mut tokens);
        assert!(tokens.is_empty());
    }
}
