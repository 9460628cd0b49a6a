//! Picks the decorator for a statement's result.

use std::sync::Arc;

use shroud_core::EncryptRule;
use shroud_rewrite::{StatementContext, StatementKind};

use crate::cursor::QueryResult;
use crate::decorator::decrypt::DecryptMergedResult;
use crate::decorator::show_columns::ShowColumnsMergedResult;
use crate::decorator::show_create_table::ShowCreateTableMergedResult;
use crate::error::MergeError;
use crate::merged::{MergedResult, TransparentMergedResult};

/// Wraps raw results so that callers only ever see logical columns.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    rule: Arc<EncryptRule>,
}

impl MergeEngine {
    pub fn new(rule: Arc<EncryptRule>) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &EncryptRule {
        &self.rule
    }

    /// Decorate the result of the statement described by `context`.
    ///
    /// Statements that touch no encrypted table come back unchanged.
    pub fn merge(
        &self,
        context: &StatementContext,
        result: Box<dyn QueryResult>,
    ) -> Result<Box<dyn MergedResult>, MergeError> {
        let merged: Box<dyn MergedResult> = match context.kind {
            StatementKind::ShowColumns => {
                Box::new(ShowColumnsMergedResult::new(result, context, &self.rule)?)
            }
            StatementKind::ShowCreateTable => {
                Box::new(ShowCreateTableMergedResult::new(result, context, &self.rule)?)
            }
            StatementKind::Select => self.merge_query(context, result)?,
            _ => Box::new(TransparentMergedResult::new(result)),
        };
        Ok(merged)
    }

    fn merge_query(
        &self,
        context: &StatementContext,
        result: Box<dyn QueryResult>,
    ) -> Result<Box<dyn MergedResult>, MergeError> {
        let encrypted = context
            .tables
            .iter()
            .any(|table| self.rule.is_encrypt_table(&table.name));
        if !encrypted {
            tracing::trace!("No encrypted table in query, result passes through");
            return Ok(Box::new(TransparentMergedResult::new(result)));
        }
        Ok(Box::new(DecryptMergedResult::resolve(result, &self.rule, context)?))
    }
}
