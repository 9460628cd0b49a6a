//! # shroud-core
//!
//! Encryption catalog shared by every Shroud crate.
//!
//! The catalog answers one question for the rest of the middleware: given a
//! table and a logical (application-visible) column, which physical columns
//! actually store it?
//!
//! | Role | Always present | Purpose |
//! |------|----------------|---------|
//! | cipher | yes | encrypted value |
//! | assisted query | no | deterministic token for equality search |
//! | like query | no | token for `LIKE` search |
//! | plain | no | unencrypted copy kept during cutover |
//!
//! The catalog is built once from an [`EncryptRuleConfig`] and an
//! [`EncryptorRegistry`], and is read concurrently afterwards. Absence of a
//! table or column is never an error: callers treat it as "nothing to rewrite".

pub mod config;
pub mod encryptor;
pub mod rule;

pub use config::{
    ColumnItemConfig, ConfigError, EncryptColumnConfig, EncryptRuleConfig, EncryptTableConfig,
};
pub use encryptor::{Encryptor, EncryptorError, EncryptorRegistry};
pub use rule::{ColumnItem, ColumnRole, EncryptColumn, EncryptRule, EncryptTable, PhysicalColumn};
