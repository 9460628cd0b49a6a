//! Encryptor capability.
//!
//! Shroud never implements cryptography itself. Algorithms are plugged in by
//! the embedding application through the [`Encryptor`] trait and looked up by
//! name in an [`EncryptorRegistry`] while the rule is being built.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by encryptors.
#[derive(Debug, Error)]
pub enum EncryptorError {
    /// The algorithm is one-way (digest-style assisted or like query).
    #[error("encryptor for {table}.{column} cannot decrypt")]
    DecryptUnsupported { table: String, column: String },

    /// The ciphertext could not be decrypted.
    #[error("failed to decrypt {table}.{column}: {reason}")]
    DecryptFailed {
        table: String,
        column: String,
        reason: String,
    },

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Computes the stored form of a logical value for one physical role.
///
/// The same trait serves cipher, assisted-query and like-query columns; only
/// cipher encryptors are expected to implement [`Encryptor::decrypt`].
pub trait Encryptor: Send + Sync {
    /// Compute the stored value for `plaintext` written to `table`.`column`.
    fn encrypt(&self, table: &str, column: &str, plaintext: &str) -> String;

    /// Recover the logical value of a stored cipher value.
    fn decrypt(&self, table: &str, column: &str, ciphertext: &str) -> Result<String, EncryptorError> {
        let _ = ciphertext;
        Err(EncryptorError::DecryptUnsupported {
            table: table.to_string(),
            column: column.to_string(),
        })
    }
}

/// Named encryptors available to the rule builder.
#[derive(Clone, Default)]
pub struct EncryptorRegistry {
    encryptors: HashMap<String, Arc<dyn Encryptor>>,
}

impl EncryptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an encryptor under `name`, replacing any previous one.
    pub fn register(mut self, name: impl Into<String>, encryptor: impl Encryptor + 'static) -> Self {
        self.insert(name, Arc::new(encryptor));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, encryptor: Arc<dyn Encryptor>) {
        self.encryptors.insert(name.into(), encryptor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Encryptor>> {
        self.encryptors.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.encryptors.contains_key(name)
    }
}

impl fmt::Debug for EncryptorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.encryptors.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("EncryptorRegistry")
            .field("encryptors", &names)
            .finish()
    }
}
