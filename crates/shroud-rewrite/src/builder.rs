//! Token applier.

use crate::error::RewriteError;
use crate::token::SqlToken;

/// Produces rewritten SQL from the original text and a token set.
///
/// Tokens are applied in ascending start order; tokens sharing a start keep
/// the order they were generated in. Text outside every token is copied as
/// is. A token starting inside a span already consumed by an earlier token
/// still renders its replacement, which is how insertions are placed next to
/// a removed definition.
pub struct SqlBuilder<'a> {
    sql: &'a str,
    tokens: Vec<&'a SqlToken>,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(sql: &'a str, tokens: &'a [SqlToken]) -> Self {
        let mut tokens: Vec<&SqlToken> = tokens.iter().collect();
        tokens.sort_by_key(|token| token.span.start);
        Self { sql, tokens }
    }

    pub fn to_sql(&self) -> Result<String, RewriteError> {
        let mut out = String::with_capacity(self.sql.len());
        let mut cursor = 0;

        for token in &self.tokens {
            let start = token.span.start;
            let end = if token.span.is_insertion() {
                start
            } else {
                token.span.end
            };

            if start > cursor {
                out.push_str(self.slice(cursor, start)?);
            } else {
                // Still validates the boundaries of a nested token.
                self.slice(start, start)?;
            }
            self.slice(start, end)?;
            out.push_str(&token.render(self.sql)?);
            cursor = cursor.max(end);
        }

        out.push_str(self.slice(cursor, self.sql.len())?);
        Ok(out)
    }

    fn slice(&self, start: usize, end: usize) -> Result<&'a str, RewriteError> {
        self.sql.get(start..end).ok_or(RewriteError::InvalidToken {
            start,
            end,
            len: self.sql.len(),
        })
    }
}
