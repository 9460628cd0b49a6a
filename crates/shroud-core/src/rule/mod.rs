//! The encryption catalog.

mod column;
mod table;

pub use column::{ColumnItem, ColumnRole, EncryptColumn, PhysicalColumn};
pub use table::EncryptTable;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ColumnItemConfig, ConfigError, EncryptColumnConfig, EncryptRuleConfig};
use crate::encryptor::{Encryptor, EncryptorRegistry};

/// Immutable mapping from table name to its encrypted columns.
///
/// Built once and shared between rewrites; every method is a pure read.
#[derive(Debug, Clone, Default)]
pub struct EncryptRule {
    tables: HashMap<String, Arc<EncryptTable>>,
}

impl EncryptRule {
    pub fn new(tables: impl IntoIterator<Item = EncryptTable>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|table| (table.name().to_ascii_lowercase(), Arc::new(table)))
                .collect(),
        }
    }

    /// Build the catalog from configuration, resolving encryptor names
    /// against `registry`.
    pub fn from_config(
        config: &EncryptRuleConfig,
        registry: &EncryptorRegistry,
    ) -> Result<Self, ConfigError> {
        let mut tables = Vec::with_capacity(config.tables.len());

        for (table_name, table_config) in &config.tables {
            let columns = table_config
                .columns
                .iter()
                .map(|(logical, column)| build_column(table_name, logical, column, registry))
                .collect::<Result<Vec<_>, _>>()?;

            let query_with_cipher = table_config
                .query_with_cipher_column
                .unwrap_or(config.query_with_cipher_column);

            tracing::debug!(
                table = table_name.as_str(),
                columns = columns.len(),
                query_with_cipher,
                "Loaded encrypt table"
            );
            tables.push(EncryptTable::new(table_name, columns, query_with_cipher)?);
        }

        Ok(Self::new(tables))
    }

    /// Find a table by name. Quoting and a schema prefix are ignored.
    pub fn find_table(&self, name: &str) -> Option<&Arc<EncryptTable>> {
        self.tables.get(&normalize_table_name(name))
    }

    pub fn is_encrypt_table(&self, name: &str) -> bool {
        self.find_table(name).is_some()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<EncryptTable>> {
        self.tables.values()
    }

    pub fn find_encrypt_column(&self, table: &str, logical: &str) -> Option<&EncryptColumn> {
        self.find_table(table)?.find_encrypt_column(logical)
    }

    pub fn find_encryptor(&self, table: &str, logical: &str) -> Option<&Arc<dyn Encryptor>> {
        self.find_table(table)?.find_encryptor(logical)
    }

    /// Unknown tables read their stored values, which is the cipher path.
    pub fn is_query_with_cipher_column(&self, table: &str) -> bool {
        self.find_table(table)
            .is_none_or(|t| t.query_with_cipher_column())
    }

    pub fn cipher_column(&self, table: &str, logical: &str) -> Option<&str> {
        self.find_table(table)?.cipher_column(logical)
    }

    pub fn find_assisted_query_column(&self, table: &str, logical: &str) -> Option<&str> {
        self.find_table(table)?.find_assisted_query_column(logical)
    }

    pub fn find_like_query_column(&self, table: &str, logical: &str) -> Option<&str> {
        self.find_table(table)?.find_like_query_column(logical)
    }

    pub fn find_plain_column(&self, table: &str, logical: &str) -> Option<&str> {
        self.find_table(table)?.find_plain_column(logical)
    }
}

fn build_column(
    table: &str,
    logical: &str,
    config: &EncryptColumnConfig,
    registry: &EncryptorRegistry,
) -> Result<EncryptColumn, ConfigError> {
    let mut column = EncryptColumn::new(logical, build_item(table, logical, &config.cipher, registry)?);
    if let Some(assisted) = &config.assisted_query {
        column = column.with_assisted_query(build_item(table, logical, assisted, registry)?);
    }
    if let Some(like) = &config.like_query {
        column = column.with_like_query(build_item(table, logical, like, registry)?);
    }
    if let Some(plain) = &config.plain {
        column = column.with_plain(plain);
    }
    Ok(column)
}

fn build_item(
    table: &str,
    logical: &str,
    config: &ColumnItemConfig,
    registry: &EncryptorRegistry,
) -> Result<ColumnItem, ConfigError> {
    let encryptor = registry.get(&config.encryptor).ok_or_else(|| {
        ConfigError::Config(format!(
            "unknown encryptor '{}' for {}.{}",
            config.encryptor, table, logical
        ))
    })?;
    Ok(ColumnItem::new(&config.name, encryptor))
}

/// Lower-case a table name and strip quotes and any schema qualifier.
pub fn normalize_table_name(name: &str) -> String {
    let unqualified = name.rsplit('.').next().unwrap_or(name);
    unqualified
        .trim_matches(|c| c == '`' || c == '"' || c == '[' || c == ']')
        .to_ascii_lowercase()
}
