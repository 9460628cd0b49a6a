//! Configuration types for the encryption catalog.
//!
//! The encrypt rule is declared in YAML (or JSON) and turned into an immutable
//! [`EncryptRule`](crate::rule::EncryptRule) once, when the middleware starts.
//!
//! ```yaml
//! query_with_cipher_column: true
//! tables:
//!   t_user:
//!     query_with_cipher_column: false
//!     columns:
//!       user_id:
//!         cipher: { name: user_id_cipher, encryptor: aes }
//!         assisted_query: { name: user_id_assisted, encryptor: md5 }
//!         plain: user_id_plain
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating the encrypt rule.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Top-level encrypt rule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptRuleConfig {
    /// Whether reads use the cipher column when a plain column also exists.
    /// Tables can override this individually.
    #[serde(default = "default_true")]
    pub query_with_cipher_column: bool,

    /// Encrypted tables keyed by table name.
    #[serde(default)]
    pub tables: BTreeMap<String, EncryptTableConfig>,
}

impl Default for EncryptRuleConfig {
    fn default() -> Self {
        Self {
            query_with_cipher_column: default_true(),
            tables: BTreeMap::new(),
        }
    }
}

/// Per-table encrypt configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptTableConfig {
    /// Overrides the global `query_with_cipher_column` flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_with_cipher_column: Option<bool>,

    /// Encrypted logical columns keyed by logical name.
    #[serde(default)]
    pub columns: BTreeMap<String, EncryptColumnConfig>,
}

/// Physical layout of one logical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptColumnConfig {
    pub cipher: ColumnItemConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assisted_query: Option<ColumnItemConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_query: Option<ColumnItemConfig>,

    /// Plain columns store the original value and need no encryptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain: Option<String>,
}

/// A physical column together with the name of the encryptor computing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnItemConfig {
    pub name: String,
    pub encryptor: String,
}

impl ColumnItemConfig {
    pub fn new(name: impl Into<String>, encryptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encryptor: encryptor.into(),
        }
    }
}

impl EncryptRuleConfig {
    /// Load the rule from a file. `.json` files are parsed as JSON, anything
    /// else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Parse the rule from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Parse the rule from JSON content.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Add or replace a table.
    pub fn with_table(mut self, name: impl Into<String>, table: EncryptTableConfig) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Look up a table case-insensitively.
    pub fn table(&self, name: &str) -> Option<&EncryptTableConfig> {
        self.tables
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, table)| table)
    }

    /// Effective `query_with_cipher_column` flag for a table.
    pub fn query_with_cipher_column(&self, table: &str) -> bool {
        self.table(table)
            .and_then(|t| t.query_with_cipher_column)
            .unwrap_or(self.query_with_cipher_column)
    }
}

impl EncryptTableConfig {
    pub fn with_column(mut self, logical: impl Into<String>, column: EncryptColumnConfig) -> Self {
        self.columns.insert(logical.into(), column);
        self
    }

    pub fn with_query_with_cipher_column(mut self, enabled: bool) -> Self {
        self.query_with_cipher_column = Some(enabled);
        self
    }
}

impl EncryptColumnConfig {
    /// A column with only the mandatory cipher role.
    pub fn new(cipher: impl Into<String>, encryptor: impl Into<String>) -> Self {
        Self {
            cipher: ColumnItemConfig::new(cipher, encryptor),
            assisted_query: None,
            like_query: None,
            plain: None,
        }
    }

    pub fn with_assisted_query(
        mut self,
        name: impl Into<String>,
        encryptor: impl Into<String>,
    ) -> Self {
        self.assisted_query = Some(ColumnItemConfig::new(name, encryptor));
        self
    }

    pub fn with_like_query(mut self, name: impl Into<String>, encryptor: impl Into<String>) -> Self {
        self.like_query = Some(ColumnItemConfig::new(name, encryptor));
        self
    }

    pub fn with_plain(mut self, name: impl Into<String>) -> Self {
        self.plain = Some(name.into());
        self
    }
}

fn default_true() -> bool {
    true
}
