//! Per-statement token buffer.

use crate::token::SqlToken;

/// Ordered tokens for one statement, passed by `&mut` through every
/// generator. Later generators may supersede tokens emitted earlier.
#[derive(Debug, Clone, Default)]
pub struct TokenBuffer {
    tokens: Vec<SqlToken>,
}

impl TokenBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: SqlToken) {
        tracing::trace!(start = token.span.start, end = token.span.end, "Token emitted");
        self.tokens.push(token);
    }

    /// Push unless a token with the same span is already buffered.
    pub fn push_unique(&mut self, token: SqlToken) -> bool {
        if self.tokens.iter().any(|t| t.span == token.span) {
            return false;
        }
        self.push(token);
        true
    }

    /// Drop every token anchored at `start`, returning how many were removed.
    pub fn remove_anchored_at(&mut self, start: usize) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|t| t.span.start != start);
        before - self.tokens.len()
    }

    pub fn tokens(&self) -> &[SqlToken] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn into_tokens(self) -> Vec<SqlToken> {
        self.tokens
    }
}

impl From<Vec<SqlToken>> for TokenBuffer {
    fn from(tokens: Vec<SqlToken>) -> Self {
        Self { tokens }
    }
}

impl Extend<SqlToken> for TokenBuffer {
    fn extend<I: IntoIterator<Item = SqlToken>>(&mut self, iter: I) {
        for token in iter {
            self.push(token);
        }
    }
}
