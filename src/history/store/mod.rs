//! Storage backends for the history ledger.
//!
//! The ledger only sees [`HistoryStore`]: bulk read of every entry in a
//! logical table, and bulk write of a set of entries. One implementation
//! exists per backend kind:
//!
//! - [`RedbStore`]: embedded document store, one `redb` table per logical table.
//! - [`SqliteStore`]: relational store, one SQLite table per logical table.
//! - [`FileStore`]: flat JSON Lines files, one file per logical table.

mod file;
mod redb_store;
mod sqlite;

pub use self::file::FileStore;
pub use self::redb_store::RedbStore;
pub use self::sqlite::SqliteStore;

use crate::error::HistoryError;

/// How a write treats the entries already stored in a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Keep stored entries and add the new ones; duplicates are ignored.
    Append,
    /// Drop stored entries, then write the new ones.
    Replace,
}

/// Bulk read/write access to one storage backend.
pub trait HistoryStore: Send + Sync {
    /// Short backend name used in log lines.
    fn name(&self) -> &str;

    /// Returns every entry of `table`. A missing store or table is empty, not an error.
    fn read_all(&self, table: &str) -> Result<Vec<String>, HistoryError>;

    /// Persists `entries` into `table` and returns how many were newly stored.
    fn write(&self, table: &str, entries: &[String], mode: WriteMode)
        -> Result<usize, HistoryError>;
}

/// Table names end up in file names and SQL identifiers.
pub(crate) fn validate_table(table: &str) -> Result<(), HistoryError> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(HistoryError::InvalidTable(table.to_string()))
    }
}

/// Creates the parent directory of a database file, if it has one.
pub(crate) fn ensure_parent(path: &std::path::Path) -> Result<(), HistoryError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
