//! Token generators.
//!
//! One generator per statement shape. Each is a pure function of the
//! statement and the catalog that appends tokens to a [`TokenBuffer`]; the
//! dispatch below runs the ones that apply to a statement.
//!
//! | Shape | Generator |
//! |-------|-----------|
//! | `CREATE TABLE` | [`create_table`] |
//! | `ALTER TABLE` | [`alter_table`] |
//! | `INSERT` column list and `VALUES` | [`insert`] |
//! | `ON DUPLICATE KEY UPDATE`, `UPDATE ... SET` | [`assignment`] |
//! | `WHERE`, `HAVING`, `JOIN ... ON` | [`predicate`] |
//! | `ORDER BY`, `GROUP BY` | [`order_by`] |
//! | `SELECT` projections | [`projection`] |

pub mod alter_table;
pub mod assignment;
pub mod create_table;
pub mod insert;
pub mod order_by;
pub mod predicate;
pub mod projection;
pub(crate) mod resolve;

use shroud_core::EncryptRule;

use crate::buffer::TokenBuffer;
use crate::error::RewriteError;
use crate::statement::Statement;
use crate::token::SqlToken;

/// Tokens rewriting `statement` against `rule`.
///
/// Returns an empty set when nothing in the statement is encrypted.
pub fn generate_tokens(
    statement: &Statement,
    rule: &EncryptRule,
) -> Result<Vec<SqlToken>, RewriteError> {
    let mut tokens = TokenBuffer::new();
    generate_into(statement, rule, &mut tokens)?;
    Ok(tokens.into_tokens())
}

/// Append the tokens for `statement` to a buffer that may already hold
/// tokens from other rewrite features.
///
/// Fails only for an `ALTER TABLE ... CHANGE COLUMN` that cannot be
/// expressed on the physical columns.
pub fn generate_into(
    statement: &Statement,
    rule: &EncryptRule,
    tokens: &mut TokenBuffer,
) -> Result<(), RewriteError> {
    match statement {
        Statement::CreateTable(create) => create_table::generate(create, rule, tokens),
        Statement::AlterTable(alter) => alter_table::generate(alter, rule, tokens)?,
        Statement::Insert(insert) => {
            insert::generate(insert, rule, tokens);
            assignment::generate_on_duplicate(insert, rule, tokens);
        }
        Statement::Update(update) => {
            assignment::generate_set(update, rule, tokens);
            if let Some(where_clause) = &update.where_clause {
                predicate::generate_where(where_clause, &update.tables, rule, tokens);
            }
        }
        Statement::Delete(delete) => {
            if let Some(where_clause) = &delete.where_clause {
                predicate::generate_where(where_clause, &delete.tables, rule, tokens);
            }
        }
        Statement::Select(select) => {
            predicate::generate(select, rule, tokens);
            order_by::generate(select, rule, tokens);
            // Runs last: shorthand expansion supersedes earlier tokens at its start.
            projection::generate(select, rule, tokens);
        }
        Statement::Other => {}
    }
    Ok(())
}
