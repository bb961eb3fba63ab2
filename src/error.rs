//! Error types for the collector and the history ledger.
//!
//! Ledger errors are never fatal to a crawl: they are logged where they occur
//! and, for flushes, handed back so the caller can decide whether to retry.

use thiserror::Error;

/// Errors raised by history stores and request (de)serialization.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("Database creation error: {0}")]
    RedbCreate(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid table name: {0:?}")]
    InvalidTable(String),

    #[error("Invalid request record: {0}")]
    Request(String),
}

/// Errors raised by the collector and its producer handles.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Collector queue closed: {0}")]
    Closed(&'static str),

    #[error("Collector configuration error: {0}")]
    Config(String),
}

/// Errors raised by an [`Output`](crate::collector::Output) implementation.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
