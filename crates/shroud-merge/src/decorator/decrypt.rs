//! Decryption of SELECT results.

use std::sync::Arc;

use shroud_core::{ColumnRole, EncryptRule, EncryptTable};
use shroud_rewrite::{ProjectionReference, StatementContext, TableReference};

use crate::cursor::QueryResult;
use crate::error::MergeError;
use crate::merged::MergedResult;
use crate::value::{Value, ValueType};

/// Where a result column comes from in the encryption catalog.
#[derive(Debug, Clone)]
pub struct ColumnOrigin {
    pub table: Arc<EncryptTable>,
    pub logical: String,
    pub role: ColumnRole,
}

impl ColumnOrigin {
    /// Match a column label against the tables of the statement.
    ///
    /// A logical label is the projection alias of a rewritten read, so it
    /// carries whichever physical column the read chose. A physical label is
    /// taken at its role. The first table that knows the label wins.
    pub fn resolve(rule: &EncryptRule, tables: &[TableReference], label: &str) -> Option<Self> {
        tables
            .iter()
            .filter_map(|table| rule.find_table(&table.name))
            .find_map(|table| Self::in_table(table, label))
    }

    /// Match a projected column against the tables of the statement.
    ///
    /// A qualified column only resolves in the table its owner names, through
    /// an alias first and a table name second.
    pub fn resolve_projection(
        rule: &EncryptRule,
        tables: &[TableReference],
        projection: &ProjectionReference,
    ) -> Option<Self> {
        let Some(owner) = &projection.owner else {
            return Self::resolve(rule, tables, &projection.column);
        };
        let table_name = tables
            .iter()
            .find(|t| t.alias.as_ref().is_some_and(|alias| alias.eq_ignore_ascii_case(owner)))
            .or_else(|| tables.iter().find(|t| t.name.eq_ignore_ascii_case(owner)))
            .map_or(owner.as_str(), |t| t.name.as_str());
        Self::in_table(rule.find_table(table_name)?, &projection.column)
    }

    fn in_table(table: &Arc<EncryptTable>, name: &str) -> Option<Self> {
        if let Some(column) = table.find_encrypt_column(name) {
            let role = if !table.query_with_cipher_column() && column.plain().is_some() {
                ColumnRole::Plain
            } else {
                ColumnRole::Cipher
            };
            return Some(Self {
                logical: column.logical_name().to_string(),
                table: Arc::clone(table),
                role,
            });
        }
        let (column, role) = table.find_by_physical(name)?;
        Some(Self {
            logical: column.logical_name().to_string(),
            table: Arc::clone(table),
            role,
        })
    }
}

/// Decrypts cipher columns of a SELECT result on read.
pub struct DecryptMergedResult {
    result: Box<dyn QueryResult>,
    origins: Vec<Option<ColumnOrigin>>,
}

impl DecryptMergedResult {
    /// `origins` is indexed like the columns of `result`.
    pub fn new(result: Box<dyn QueryResult>, origins: Vec<Option<ColumnOrigin>>) -> Self {
        Self { result, origins }
    }

    /// Resolve the origin of every column of `result`.
    ///
    /// A column whose label matches a projection of the statement resolves
    /// through that projection, preferring the projection at the same
    /// position. Other labels resolve against the tables alone.
    pub fn resolve(
        result: Box<dyn QueryResult>,
        rule: &EncryptRule,
        context: &StatementContext,
    ) -> Result<Self, MergeError> {
        let tables = context.tables.as_slice();
        let origins = (0..result.column_count())
            .map(|index| {
                let label = result.column_label(index)?;
                let labelled = |p: &&ProjectionReference| p.label.eq_ignore_ascii_case(&label);
                let projection = context
                    .projections
                    .get(index)
                    .filter(labelled)
                    .or_else(|| context.projections.iter().find(labelled));
                Ok(match projection {
                    Some(projection) => ColumnOrigin::resolve_projection(rule, tables, projection),
                    None => ColumnOrigin::resolve(rule, tables, &label),
                })
            })
            .collect::<Result<Vec<_>, MergeError>>()?;
        tracing::debug!(
            columns = origins.len(),
            decrypted = origins
                .iter()
                .flatten()
                .filter(|origin| origin.role == ColumnRole::Cipher)
                .count(),
            "Decorating SELECT result"
        );
        Ok(Self::new(result, origins))
    }

    fn cipher_origin(&self, index: usize) -> Option<&ColumnOrigin> {
        self.origins
            .get(index)
            .and_then(Option::as_ref)
            .filter(|origin| origin.role == ColumnRole::Cipher)
    }
}

impl MergedResult for DecryptMergedResult {
    fn advance(&mut self) -> Result<bool, MergeError> {
        self.result.advance()
    }

    fn value_at(&mut self, index: usize, ty: ValueType) -> Result<Value, MergeError> {
        let Some(origin) = self.cipher_origin(index) else {
            return self.result.value_at(index, ty);
        };
        let Some(column) = origin.table.find_encrypt_column(&origin.logical) else {
            return self.result.value_at(index, ty);
        };
        let encryptor = Arc::clone(column.cipher().encryptor());
        let table = origin.table.name().to_string();
        let logical = origin.logical.clone();

        let stored = self.result.value_at(index, ValueType::Any)?;
        let value = match stored.as_text() {
            Some(ciphertext) => Value::text(encryptor.decrypt(&table, &logical, ciphertext)?),
            None => stored,
        };
        value
            .convert(ty)
            .ok_or(MergeError::InvalidValue { index, expected: ty })
    }

    fn was_null(&self) -> bool {
        self.result.was_null()
    }
}
