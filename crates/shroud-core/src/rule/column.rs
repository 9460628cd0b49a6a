//! Logical column mapping.

use std::fmt;
use std::sync::Arc;

use crate::encryptor::Encryptor;

/// Role a physical column plays for its logical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Cipher,
    AssistedQuery,
    LikeQuery,
    Plain,
}

impl ColumnRole {
    /// Assisted-query and like-query columns are never shown to callers.
    pub fn is_derived(self) -> bool {
        matches!(self, ColumnRole::AssistedQuery | ColumnRole::LikeQuery)
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::Cipher => "cipher",
            ColumnRole::AssistedQuery => "assisted_query",
            ColumnRole::LikeQuery => "like_query",
            ColumnRole::Plain => "plain",
        };
        f.write_str(name)
    }
}

/// A physical column computed by an encryptor.
#[derive(Clone)]
pub struct ColumnItem {
    name: String,
    encryptor: Arc<dyn Encryptor>,
}

impl ColumnItem {
    pub fn new(name: impl Into<String>, encryptor: Arc<dyn Encryptor>) -> Self {
        Self {
            name: name.into(),
            encryptor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encryptor(&self) -> &Arc<dyn Encryptor> {
        &self.encryptor
    }
}

impl fmt::Debug for ColumnItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnItem")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A physical column name tagged with its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalColumn<'a> {
    pub name: &'a str,
    pub role: ColumnRole,
}

/// One logical column and the physical columns storing it.
#[derive(Debug, Clone)]
pub struct EncryptColumn {
    logical_name: String,
    cipher: ColumnItem,
    assisted_query: Option<ColumnItem>,
    like_query: Option<ColumnItem>,
    plain: Option<String>,
}

impl EncryptColumn {
    pub fn new(logical_name: impl Into<String>, cipher: ColumnItem) -> Self {
        Self {
            logical_name: logical_name.into(),
            cipher,
            assisted_query: None,
            like_query: None,
            plain: None,
        }
    }

    pub fn with_assisted_query(mut self, item: ColumnItem) -> Self {
        self.assisted_query = Some(item);
        self
    }

    pub fn with_like_query(mut self, item: ColumnItem) -> Self {
        self.like_query = Some(item);
        self
    }

    pub fn with_plain(mut self, name: impl Into<String>) -> Self {
        self.plain = Some(name.into());
        self
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn cipher(&self) -> &ColumnItem {
        &self.cipher
    }

    pub fn assisted_query(&self) -> Option<&ColumnItem> {
        self.assisted_query.as_ref()
    }

    pub fn like_query(&self) -> Option<&ColumnItem> {
        self.like_query.as_ref()
    }

    pub fn plain(&self) -> Option<&str> {
        self.plain.as_deref()
    }

    /// Physical name for a role, if the column has one.
    pub fn role_name(&self, role: ColumnRole) -> Option<&str> {
        match role {
            ColumnRole::Cipher => Some(self.cipher.name()),
            ColumnRole::AssistedQuery => self.assisted_query.as_ref().map(ColumnItem::name),
            ColumnRole::LikeQuery => self.like_query.as_ref().map(ColumnItem::name),
            ColumnRole::Plain => self.plain.as_deref(),
        }
    }

    /// Every physical column in role order: cipher, assisted query, like
    /// query, plain.
    pub fn physical_columns(&self) -> Vec<PhysicalColumn<'_>> {
        [
            ColumnRole::Cipher,
            ColumnRole::AssistedQuery,
            ColumnRole::LikeQuery,
            ColumnRole::Plain,
        ]
        .into_iter()
        .filter_map(|role| self.role_name(role).map(|name| PhysicalColumn { name, role }))
        .collect()
    }

    /// Role of a physical column of this logical column.
    pub fn role_of(&self, physical: &str) -> Option<ColumnRole> {
        self.physical_columns()
            .into_iter()
            .find(|column| column.name.eq_ignore_ascii_case(physical))
            .map(|column| column.role)
    }
}
