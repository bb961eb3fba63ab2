//! Configuration consumed by the collector and the history ledger.
//!
//! Values are resolved once at startup (from TOML or built in code) and passed
//! to constructors; nothing in the crate reads global settings.
//!
//! ```toml
//! [collector]
//! docker_capacity = 500
//!
//! [history]
//! dir = "/var/lib/spider/history"
//! table_prefix = "news"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Batching and queue sizes for one [`Collector`](crate::collector::Collector).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Items per docker before its output is forced.
    pub docker_capacity: usize,
    /// Number of dockers that may exist at once (at least 2).
    pub docker_queue_capacity: usize,
    /// Capacity of the item queue.
    pub data_capacity: usize,
    /// Capacity of the file queue.
    pub file_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            docker_capacity: 10_000,
            docker_queue_capacity: 2,
            data_capacity: 1024,
            file_capacity: 512,
        }
    }
}

/// Where the history ledger keeps its records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Directory of the flat-file store and default home of the database files.
    pub dir: PathBuf,
    /// Prefix of the success (`_y`) and failure (`_n`) table names.
    pub table_prefix: String,
    /// Document store database file. Defaults to `<dir>/history.redb`.
    pub document_path: Option<PathBuf>,
    /// Relational store database file. Defaults to `<dir>/history.sqlite`.
    pub relational_path: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("history"),
            table_prefix: "history".to_string(),
            document_path: None,
            relational_path: None,
        }
    }
}

impl HistoryConfig {
    /// Creates a config rooted at `dir` with the default prefix.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn success_table(&self) -> String {
        format!("{}_y", self.table_prefix)
    }

    pub fn failure_table(&self) -> String {
        format!("{}_n", self.table_prefix)
    }

    pub fn document_path(&self) -> PathBuf {
        self.document_path
            .clone()
            .unwrap_or_else(|| self.dir.join("history.redb"))
    }

    pub fn relational_path(&self) -> PathBuf {
        self.relational_path
            .clone()
            .unwrap_or_else(|| self.dir.join("history.sqlite"))
    }
}

/// Top-level configuration grouping both subsystems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub collector: CollectorConfig,
    pub history: HistoryConfig,
}

impl CoreConfig {
    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
            [collector]
            docker_capacity = 3

            [history]
            table_prefix = "news"
            "#,
        )
        .unwrap();

        assert_eq!(config.collector.docker_capacity, 3);
        assert_eq!(config.collector.file_capacity, 512);
        assert_eq!(config.history.success_table(), "news_y");
        assert_eq!(config.history.failure_table(), "news_n");
        assert_eq!(
            config.history.document_path(),
            PathBuf::from("history").join("history.redb")
        );
    }

    #[test]
    fn explicit_database_paths_win() {
        let config = HistoryConfig {
            relational_path: Some(PathBuf::from("/tmp/x.sqlite")),
            ..HistoryConfig::in_dir("/data")
        };
        assert_eq!(config.relational_path(), PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(config.document_path(), PathBuf::from("/data/history.redb"));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(CoreConfig::from_toml_str("[collector\ndocker_capacity = ").is_err());
    }
}
