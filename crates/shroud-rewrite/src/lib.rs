//! # shroud-rewrite
//!
//! Encrypt-aware SQL rewriting for Shroud.
//!
//! Clients write SQL against logical columns. The backend stores each
//! encrypted logical column as up to four physical columns. This crate turns
//! one into the other:
//!
//! 1. the parser layer describes a statement as a position-tagged
//!    [`Statement`], every rewritable segment carrying its byte span;
//! 2. the [`generator`] family inspects it against the catalog and fills a
//!    [`TokenBuffer`] with edit tokens;
//! 3. [`SqlBuilder`] applies the tokens to the original text;
//! 4. [`EncryptParameterRewriter`] produces the matching bound parameters.
//!
//! [`EncryptRewriter`] runs all of it for one statement.
//!
//! **Before (from the client):**
//! ```sql
//! SELECT user_id FROM t_user WHERE pwd = ?
//! ```
//!
//! **After (to the backend):**
//! ```sql
//! SELECT user_id_cipher AS user_id FROM t_user WHERE pwd_assisted = ?
//! ```

pub mod buffer;
pub mod builder;
pub mod engine;
pub mod error;
pub mod generator;
pub mod parameter;
pub mod parser;
pub mod statement;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

pub use buffer::TokenBuffer;
pub use builder::SqlBuilder;
pub use engine::{EncryptRewriter, RewriteResult};
pub use error::RewriteError;
pub use generator::{generate_into, generate_tokens};
pub use parameter::EncryptParameterRewriter;
pub use parser::{
    ProjectionReference, SqlAnalyzer, StatementContext, StatementKind, TableReference,
};
pub use statement::{Literal, Span, Statement};
pub use token::{SqlToken, TokenKind};
