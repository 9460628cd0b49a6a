//! Encrypt rewrite entry point.

use std::sync::Arc;

use shroud_core::EncryptRule;

use crate::buffer::TokenBuffer;
use crate::builder::SqlBuilder;
use crate::error::RewriteError;
use crate::generator::generate_into;
use crate::parameter::EncryptParameterRewriter;
use crate::statement::{Literal, Statement};
use crate::token::SqlToken;

/// Rewrites statements against one encryption catalog.
///
/// Cheap to clone; the catalog is shared and never mutated.
#[derive(Debug, Clone)]
pub struct EncryptRewriter {
    rule: Arc<EncryptRule>,
}

impl EncryptRewriter {
    pub fn new(rule: Arc<EncryptRule>) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &EncryptRule {
        &self.rule
    }

    /// Rewrite `sql`, described by `statement`, and its bound parameters.
    pub fn rewrite(
        &self,
        sql: &str,
        statement: &Statement,
        parameters: &[Literal],
    ) -> Result<RewriteResult, RewriteError> {
        self.rewrite_with(sql, statement, parameters, TokenBuffer::new())
    }

    /// Same as [`rewrite`](Self::rewrite), starting from tokens other rewrite
    /// features already produced for the statement.
    pub fn rewrite_with(
        &self,
        sql: &str,
        statement: &Statement,
        parameters: &[Literal],
        mut tokens: TokenBuffer,
    ) -> Result<RewriteResult, RewriteError> {
        let seeded = tokens.len();
        generate_into(statement, &self.rule, &mut tokens)?;
        let parameters = EncryptParameterRewriter::new(&self.rule).rewrite(statement, parameters);

        let tokens = tokens.into_tokens();
        let rewritten_sql = SqlBuilder::new(sql, &tokens).to_sql()?;
        if rewritten_sql != sql {
            tracing::debug!(
                seeded,
                tokens = tokens.len(),
                original = sql,
                rewritten = rewritten_sql.as_str(),
                "Rewrote statement for encrypted columns"
            );
        }

        Ok(RewriteResult {
            original_sql: sql.to_string(),
            rewritten_sql,
            parameters,
            tokens,
        })
    }
}

/// Result of an encrypt rewrite.
#[derive(Debug, Clone)]
pub struct RewriteResult {
    /// The SQL as the client sent it.
    pub original_sql: String,
    /// The SQL sent to the backend.
    pub rewritten_sql: String,
    /// Parameters to bind to `rewritten_sql`.
    pub parameters: Vec<Literal>,
    /// The tokens applied.
    pub tokens: Vec<SqlToken>,
}

impl RewriteResult {
    pub fn is_rewritten(&self) -> bool {
        self.original_sql != self.rewritten_sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::rule;
    use crate::statement::{
        AndPredicate, Predicate, PredicateOperator, PredicateValue, QuoteCharacter,
        SelectStatement, Span, WhereSegment,
    };
    use crate::test_support::{column, table};
    use crate::token::{Splice, SubstituteProjection};
    use pretty_assertions::assert_eq;

    fn rewriter() -> EncryptRewriter {
        EncryptRewriter::new(Arc::new(rule()))
    }

    #[test]
    fn test_select_with_parameters() {
        let sql = "SELECT id FROM t_user WHERE pwd = ?";
        let statement = Statement::Select(SelectStatement {
            tables: vec![table(sql, "t_user")],
            where_clause: Some(WhereSegment::new(vec![AndPredicate {
                predicates: vec![Predicate::new(column(sql, "pwd"), PredicateOperator::Equal)
                    .with_value(PredicateValue::Parameter { index: 0 })],
            }])),
            ..Default::default()
        });

        let result = rewriter()
            .rewrite(sql, &statement, &[Literal::String("s3cret".into())])
            .unwrap();
        assert!(result.is_rewritten());
        assert_eq!(result.rewritten_sql, "SELECT id FROM t_user WHERE pwd_assisted = ?");
        assert_eq!(result.parameters, vec![Literal::String("md5(s3cret)".into())]);
        assert_eq!(result.tokens.len(), 1);
    }

    #[test]
    fn test_seeded_tokens_are_applied() {
        let sql = "SELECT id FROM t_item";
        let seeded = TokenBuffer::from(vec![SqlToken::substitute(
            Span::new(15, 21),
            vec![SubstituteProjection::new("t_item_0", QuoteCharacter::None)],
            Splice::InPlace,
        )]);
        let statement = Statement::Select(SelectStatement {
            tables: vec![table(sql, "t_item")],
            ..Default::default()
        });

        let result = rewriter().rewrite_with(sql, &statement, &[], seeded).unwrap();
        assert_eq!(result.rewritten_sql, "SELECT id FROM t_item_0");
    }

    #[test]
    fn test_unencrypted_statement_passes_through() {
        let sql = "SELECT id FROM t_item WHERE pwd = ?";
        let statement = Statement::Select(SelectStatement {
            tables: vec![table(sql, "t_item")],
            ..Default::default()
        });
        let parameters = vec![Literal::Number("1".into())];
        let result = rewriter().rewrite(sql, &statement, &parameters).unwrap();
        assert!(!result.is_rewritten());
        assert_eq!(result.parameters, parameters);
        assert!(result.tokens.is_empty());
    }
}
