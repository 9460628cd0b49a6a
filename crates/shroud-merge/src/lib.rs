//! # shroud-merge
//!
//! Result decorators for Shroud.
//!
//! The rewriter makes the backend read and write physical columns. This crate
//! turns what the backend sends back into the logical view the application
//! expects:
//!
//! - `SHOW COLUMNS` hides assisted-query and like-query columns and reports
//!   cipher columns under their logical names.
//! - `SHOW CREATE TABLE` folds the physical clauses of every encrypted column
//!   into one clause carrying the logical name.
//! - `SELECT` results have their cipher columns decrypted on read.
//!
//! ```text
//! Field            | Type             Field    | Type
//! -----------------+------------      ---------+------------
//! id               | bigint     =>    id       | bigint
//! user_id_cipher   | varchar(64)      user_id  | varchar(64)
//! user_id_assisted | varchar(64)
//! ```

pub mod cursor;
pub mod ddl;
pub mod decorator;
pub mod engine;
pub mod error;
pub mod merged;
pub mod value;

pub use cursor::{MemoryQueryResult, QueryResult};
pub use ddl::rewrite_create_table;
pub use decorator::decrypt::{ColumnOrigin, DecryptMergedResult};
pub use decorator::encrypt::EncryptMergedResult;
pub use decorator::show_columns::ShowColumnsMergedResult;
pub use decorator::show_create_table::ShowCreateTableMergedResult;
pub use engine::MergeEngine;
pub use error::MergeError;
pub use merged::{MergedResult, TransparentMergedResult};
pub use value::{Value, ValueType};
