//! Per-table encryption mapping.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::encryptor::Encryptor;

use super::column::{ColumnRole, EncryptColumn};

/// Encrypted columns of one table.
///
/// Lookups by logical or physical name are ASCII case-insensitive; the
/// configured spelling is what gets returned.
#[derive(Debug, Clone)]
pub struct EncryptTable {
    name: String,
    columns: Vec<EncryptColumn>,
    logical_index: HashMap<String, usize>,
    physical_index: HashMap<String, (usize, ColumnRole)>,
    query_with_cipher_column: bool,
}

impl EncryptTable {
    /// Build a table, rejecting logical or physical names claimed twice.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<EncryptColumn>,
        query_with_cipher_column: bool,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let mut logical_index = HashMap::new();
        let mut physical_index = HashMap::new();

        for (idx, column) in columns.iter().enumerate() {
            if column.cipher().name().is_empty() {
                return Err(ConfigError::Config(format!(
                    "cipher column of {}.{} must not be empty",
                    name,
                    column.logical_name()
                )));
            }
            if logical_index
                .insert(column.logical_name().to_ascii_lowercase(), idx)
                .is_some()
            {
                return Err(ConfigError::Config(format!(
                    "logical column {}.{} is declared twice",
                    name,
                    column.logical_name()
                )));
            }
            for physical in column.physical_columns() {
                if physical_index
                    .insert(physical.name.to_ascii_lowercase(), (idx, physical.role))
                    .is_some()
                {
                    return Err(ConfigError::Config(format!(
                        "physical column {}.{} is claimed by more than one role",
                        name, physical.name
                    )));
                }
            }
        }

        Ok(Self {
            name,
            columns,
            logical_index,
            physical_index,
            query_with_cipher_column,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encrypted logical columns in configuration order.
    pub fn encrypt_columns(&self) -> &[EncryptColumn] {
        &self.columns
    }

    pub fn query_with_cipher_column(&self) -> bool {
        self.query_with_cipher_column
    }

    pub fn find_encrypt_column(&self, logical: &str) -> Option<&EncryptColumn> {
        self.logical_index
            .get(&logical.to_ascii_lowercase())
            .map(|&idx| &self.columns[idx])
    }

    pub fn is_encrypt_column(&self, logical: &str) -> bool {
        self.logical_index.contains_key(&logical.to_ascii_lowercase())
    }

    /// Logical column and role owning a physical column.
    pub fn find_by_physical(&self, physical: &str) -> Option<(&EncryptColumn, ColumnRole)> {
        self.physical_index
            .get(&physical.to_ascii_lowercase())
            .map(|&(idx, role)| (&self.columns[idx], role))
    }

    fn has_role(&self, physical: &str, role: ColumnRole) -> bool {
        self.find_by_physical(physical)
            .is_some_and(|(_, found)| found == role)
    }

    pub fn is_cipher_column(&self, physical: &str) -> bool {
        self.has_role(physical, ColumnRole::Cipher)
    }

    pub fn is_assisted_query_column(&self, physical: &str) -> bool {
        self.has_role(physical, ColumnRole::AssistedQuery)
    }

    pub fn is_like_query_column(&self, physical: &str) -> bool {
        self.has_role(physical, ColumnRole::LikeQuery)
    }

    pub fn is_plain_column(&self, physical: &str) -> bool {
        self.has_role(physical, ColumnRole::Plain)
    }

    /// Assisted-query or like-query column.
    pub fn is_derived_column(&self, physical: &str) -> bool {
        self.find_by_physical(physical)
            .is_some_and(|(_, role)| role.is_derived())
    }

    /// Physical names of every derived column of the table.
    pub fn derived_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .flat_map(|column| column.physical_columns())
            .filter(|physical| physical.role.is_derived())
            .map(|physical| physical.name)
            .collect()
    }

    pub fn logical_name_for_cipher(&self, cipher: &str) -> Option<&str> {
        match self.find_by_physical(cipher) {
            Some((column, ColumnRole::Cipher)) => Some(column.logical_name()),
            _ => None,
        }
    }

    pub fn cipher_column(&self, logical: &str) -> Option<&str> {
        self.find_encrypt_column(logical).map(|c| c.cipher().name())
    }

    pub fn find_assisted_query_column(&self, logical: &str) -> Option<&str> {
        self.find_encrypt_column(logical)
            .and_then(|c| c.role_name(ColumnRole::AssistedQuery))
    }

    pub fn find_like_query_column(&self, logical: &str) -> Option<&str> {
        self.find_encrypt_column(logical)
            .and_then(|c| c.role_name(ColumnRole::LikeQuery))
    }

    pub fn find_plain_column(&self, logical: &str) -> Option<&str> {
        self.find_encrypt_column(logical).and_then(|c| c.plain())
    }

    /// The cipher encryptor of a logical column.
    pub fn find_encryptor(&self, logical: &str) -> Option<&Arc<dyn Encryptor>> {
        self.find_encrypt_column(logical).map(|c| c.cipher().encryptor())
    }
}
