//! Relational store backed by SQLite.

use super::{ensure_parent, validate_table, HistoryStore, WriteMode};
use crate::error::HistoryError;
use rusqlite::{params, Connection};
use std::path::PathBuf;
use tracing::{trace, warn};

pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    fn connect(&self) -> Result<Connection, HistoryError> {
        Ok(Connection::open(&self.db_path)?)
    }

    fn table_exists(conn: &Connection, table: &str) -> Result<bool, HistoryError> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl HistoryStore for SqliteStore {
    fn name(&self) -> &str {
        "relational"
    }

    fn read_all(&self, table: &str) -> Result<Vec<String>, HistoryError> {
        validate_table(table)?;
        if !self.db_path.exists() {
            return Ok(Vec::new());
        }

        let conn = self.connect()?;
        if !Self::table_exists(&conn, table)? {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(&format!("SELECT entry FROM \"{}\"", table))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut entries = Vec::new();
        for row in rows {
            match row {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping unreadable row in {}: {}", table, e),
            }
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
        ensure_parent(&self.db_path)?;

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (entry TEXT PRIMARY KEY NOT NULL)",
            table
        ))?;
        if mode == WriteMode::Replace {
            tx.execute(&format!("DELETE FROM \"{}\"", table), [])?;
        }

        let mut written = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR IGNORE INTO \"{}\" (entry) VALUES (?1)",
                table
            ))?;
            for entry in entries {
                written += stmt.execute(params![entry])?;
            }
        }
        tx.commit()?;

        trace!("Inserted {} rows into {}", written, table);
        Ok(written)
    }
}
