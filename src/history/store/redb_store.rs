//! Document store backed by an embedded `redb` database.
//!
//! Every logical table is a `redb` table keyed by entry; the value is the
//! unix time of the write that stored it.

use super::{ensure_parent, validate_table, HistoryStore, WriteMode};
use crate::error::HistoryError;
use redb::{Database, ReadableTable, TableDefinition, TableError};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

pub struct RedbStore {
    path: PathBuf,
}

impl RedbStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn definition(table: &str) -> TableDefinition<'_, &'static str, u64> {
        TableDefinition::new(table)
    }
}

impl HistoryStore for RedbStore {
    fn name(&self) -> &str {
        "document"
    }

    fn read_all(&self, table: &str) -> Result<Vec<String>, HistoryError> {
        validate_table(table)?;
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let db = Database::open(&self.path)?;
        let read_txn = db.begin_read()?;
        let docs = match read_txn.open_table(Self::definition(table)) {
            Ok(docs) => docs,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for doc in docs.iter()? {
            let (key, _stored_at) = doc?;
            entries.push(key.value().to_string());
        }
        Ok(entries)
    }

    fn write(
        &self,
        table: &str,
        entries: &[String],
        mode: WriteMode,
    ) -> Result<usize, HistoryError> {
        validate_table(table)?;
        ensure_parent(&self.path)?;

        let stored_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let db = Database::create(&self.path)?;
        let write_txn = db.begin_write()?;
        let mut written = 0;
        {
            if mode == WriteMode::Replace {
                write_txn.delete_table(Self::definition(table))?;
            }
            let mut docs = write_txn.open_table(Self::definition(table))?;
            for entry in entries {
                if docs.insert(entry.as_str(), stored_at)?.is_none() {
                    written += 1;
                }
            }
        }
        write_txn.commit()?;

        trace!("Stored {} documents in {}:{}", written, self.path.display(), table);
        Ok(written)
    }
}
