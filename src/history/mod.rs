//! # History Module
//!
//! A persistent, resumable ledger of which requests succeeded and which failed.
//!
//! ## Overview
//!
//! [`History`] keeps two in-memory structures behind one reader/writer lock:
//!
//! - the success set: fingerprints inherited from earlier runs (`old`) and
//!   fingerprints completed in this run (`new`);
//! - the failure index: serialized requests that failed, grouped by spider,
//!   so each spider can pull its own retries.
//!
//! Reads and flushes go through a [`HistoryStore`] chosen per call by a
//! [`Provider`]. Store errors never fail a crawl: reads log and continue with
//! no history, flushes log and keep the in-memory data so a later flush can
//! retry.
//!
//! ## Inheritance
//!
//! `read_*(provider, false)` starts cold and forgets everything in memory.
//! `read_*(provider, true)` loads once; further inheriting reads are no-ops
//! until `read_*(_, false)` or [`History::empty`] resets the flag. Success
//! flushes append when the set is inheritable and overwrite otherwise; failure
//! flushes always write the whole index, since memory holds the complete
//! picture.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spider_collector::history::History;
//! use spider_collector::config::HistoryConfig;
//!
//! let history = History::new(&HistoryConfig::in_dir("./history"));
//! history.read_success("file", true);
//! history.read_failure("file", true);
//!
//! if history.upsert_success(&req) {
//!     // first time this request succeeded
//! }
//! let retries = history.pull_failure("news");
//!
//! let outcome = history.flush_success("file");
//! println!("flushed {} records", outcome.written);
//! ```

mod failure;
pub mod store;
mod success;

use self::failure::Failure;
use self::store::{FileStore, HistoryStore, RedbStore, SqliteStore, WriteMode};
use self::success::Success;
use crate::config::HistoryConfig;
use crate::error::HistoryError;
use crate::request::{Record, Request};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Selects the backend a read or flush talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Embedded document store.
    Document,
    /// SQL store.
    Relational,
    /// JSON Lines files; also used for any unrecognized name.
    #[default]
    File,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Document => "document",
            Provider::Relational => "relational",
            Provider::File => "file",
        }
    }
}

impl From<&str> for Provider {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mgo" | "mongo" | "mongodb" | "document" | "redb" => Provider::Document,
            "mysql" | "sql" | "sqlite" | "relational" => Provider::Relational,
            _ => Provider::File,
        }
    }
}

impl From<&String> for Provider {
    fn from(name: &String) -> Self {
        Provider::from(name.as_str())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a flush: how many records were stored, and the error if the write failed.
#[derive(Debug, Default)]
pub struct FlushOutcome {
    pub written: usize,
    pub error: Option<HistoryError>,
}

impl FlushOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

struct Ledger {
    success: Success,
    failure: Failure,
    provider: Provider,
}

struct Stores {
    document: Arc<dyn HistoryStore>,
    relational: Arc<dyn HistoryStore>,
    file: Arc<dyn HistoryStore>,
}

impl Stores {
    fn get(&self, provider: Provider) -> &Arc<dyn HistoryStore> {
        match provider {
            Provider::Document => &self.document,
            Provider::Relational => &self.relational,
            Provider::File => &self.file,
        }
    }

    fn set(&mut self, provider: Provider, store: Arc<dyn HistoryStore>) {
        match provider {
            Provider::Document => self.document = store,
            Provider::Relational => self.relational = store,
            Provider::File => self.file = store,
        }
    }
}

/// The success/failure ledger shared by every task that needs history.
///
/// Success and failure bookkeeping are independent but share one lock.
pub struct History {
    inner: RwLock<Ledger>,
    stores: Stores,
    success_table: String,
    failure_table: String,
}

impl History {
    /// Creates an empty ledger with the built-in store for every provider.
    ///
    /// No I/O happens until the first read or flush.
    pub fn new(config: &HistoryConfig) -> Self {
        History {
            inner: RwLock::new(Ledger {
                success: Success::default(),
                failure: Failure::default(),
                provider: Provider::default(),
            }),
            stores: Stores {
                document: Arc::new(RedbStore::new(config.document_path())),
                relational: Arc::new(SqliteStore::new(config.relational_path())),
                file: Arc::new(FileStore::new(config.dir.clone())),
            },
            success_table: config.success_table(),
            failure_table: config.failure_table(),
        }
    }

    /// Replaces the store used for `provider`.
    pub fn with_store(mut self, provider: impl Into<Provider>, store: Arc<dyn HistoryStore>) -> Self {
        self.stores.set(provider.into(), store);
        self
    }

    /// The provider used by the most recent read or flush.
    pub fn provider(&self) -> Provider {
        self.inner.read().provider
    }

    /// Loads success fingerprints, or resets them when `inherit` is false.
    pub fn read_success(&self, provider: impl Into<Provider>, inherit: bool) {
        let provider = provider.into();
        let mut ledger = self.inner.write();
        ledger.provider = provider;

        if !inherit {
            trace!("Success history reset without inheritance");
            ledger.success.reset(false);
            return;
        }
        if ledger.success.inheritable {
            trace!("Success history already inherited, skipping load");
            return;
        }
        ledger.success.reset(true);

        let store = self.stores.get(provider);
        match store.read_all(&self.success_table) {
            Ok(keys) => {
                let loaded = ledger.success.load(keys);
                info!("Loaded {} success records from {}", loaded, store.name());
            }
            Err(e) => {
                error!("Failed to read success records from {}: {}", store.name(), e);
            }
        }
    }

    /// Loads failed requests, or resets them when `inherit` is false.
    pub fn read_failure(&self, provider: impl Into<Provider>, inherit: bool) {
        let provider = provider.into();
        let mut ledger = self.inner.write();
        ledger.provider = provider;

        if !inherit {
            trace!("Failure history reset without inheritance");
            ledger.failure.reset(false);
            return;
        }
        if ledger.failure.inheritable {
            trace!("Failure history already inherited, skipping load");
            return;
        }
        ledger.failure.reset(true);

        let store = self.stores.get(provider);
        match store.read_all(&self.failure_table) {
            Ok(records) => {
                let (loaded, skipped) = ledger.failure.load(records);
                if skipped > 0 {
                    warn!("Skipped {} undecodable failure records", skipped);
                }
                info!("Loaded {} failure records from {}", loaded, store.name());
            }
            Err(e) => {
                ledger.failure.load_failed = true;
                error!("Failed to read failure records from {}: {}", store.name(), e);
            }
        }
    }

    /// Records a success. Returns false if it was already known.
    pub fn upsert_success<R: Record + ?Sized>(&self, record: &R) -> bool {
        let key = record.fingerprint();
        self.inner.write().success.upsert(key)
    }

    /// Whether the record is known to have succeeded in this or an earlier run.
    pub fn has_success<R: Record + ?Sized>(&self, record: &R) -> bool {
        let key = record.fingerprint();
        self.inner.read().success.contains(&key)
    }

    /// Forgets a success so the request can be fetched again.
    pub fn delete_success<R: Record + ?Sized>(&self, record: &R) {
        let key = record.fingerprint();
        self.inner.write().success.remove(&key);
    }

    /// Records a failure. Returns false if it was already recorded.
    pub fn upsert_failure(&self, req: &Request) -> bool {
        match req.serialize() {
            Ok(key) => self
                .inner
                .write()
                .failure
                .upsert(req.spider_name().to_string(), key),
            Err(e) => {
                error!("Cannot record failure for {}: {}", req.url, e);
                false
            }
        }
    }

    /// Forgets a failure, typically once its retry succeeded.
    pub fn delete_failure(&self, req: &Request) {
        match req.serialize() {
            Ok(key) => self.inner.write().failure.remove(req.spider_name(), &key),
            Err(e) => error!("Cannot delete failure for {}: {}", req.url, e),
        }
    }

    /// Snapshot of the failed requests recorded for `spider_name`.
    pub fn pull_failure(&self, spider_name: &str) -> Vec<Request> {
        self.inner.read().failure.pull(spider_name)
    }

    /// Persists this run's successes. The cache is kept.
    pub fn flush_success(&self, provider: impl Into<Provider>) -> FlushOutcome {
        let provider = provider.into();
        let mut ledger = self.inner.write();
        ledger.provider = provider;

        let pending = ledger.success.pending();
        if pending.is_empty() {
            debug!("No new success records to flush");
            return FlushOutcome::default();
        }

        let mode = if ledger.success.inheritable {
            WriteMode::Append
        } else {
            WriteMode::Replace
        };
        let store = self.stores.get(provider);
        match store.write(&self.success_table, &pending, mode) {
            Ok(written) => {
                ledger.success.commit();
                info!("Flushed {} success records to {}", written, store.name());
                FlushOutcome {
                    written,
                    error: None,
                }
            }
            Err(e) => {
                error!(
                    "Failed to flush {} success records to {}: {}",
                    pending.len(),
                    store.name(),
                    e
                );
                FlushOutcome {
                    written: 0,
                    error: Some(e),
                }
            }
        }
    }

    /// Persists the failure index. The cache is kept.
    pub fn flush_failure(&self, provider: impl Into<Provider>) -> FlushOutcome {
        let provider = provider.into();
        let mut ledger = self.inner.write();
        ledger.provider = provider;

        let entries = ledger.failure.entries();
        let mode = if ledger.failure.load_failed {
            // Durable records were never loaded; replacing would lose them.
            warn!("Failure history was not loaded, appending instead of replacing");
            WriteMode::Append
        } else {
            WriteMode::Replace
        };
        if entries.is_empty() && mode == WriteMode::Append {
            return FlushOutcome::default();
        }

        let store = self.stores.get(provider);
        match store.write(&self.failure_table, &entries, mode) {
            Ok(written) => {
                info!("Flushed {} failure records to {}", written, store.name());
                FlushOutcome {
                    written,
                    error: None,
                }
            }
            Err(e) => {
                error!(
                    "Failed to flush {} failure records to {}: {}",
                    entries.len(),
                    store.name(),
                    e
                );
                FlushOutcome {
                    written: 0,
                    error: Some(e),
                }
            }
        }
    }

    /// Clears every cached success and failure without writing anything.
    pub fn empty(&self) {
        let mut ledger = self.inner.write();
        ledger.success.reset(false);
        ledger.failure.reset(false);
        debug!("History cache emptied");
    }

    /// `(inherited, new)` success counts and the failure count, for diagnostics.
    pub fn counts(&self) -> (usize, usize, usize) {
        let ledger = self.inner.read();
        let (old, new) = ledger.success.len();
        (old, new, ledger.failure.len())
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (old, new, failures) = self.counts();
        f.debug_struct("History")
            .field("provider", &self.provider())
            .field("success_old", &old)
            .field("success_new", &new)
            .field("failures", &failures)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory store that counts calls and can be told to fail.
    #[derive(Default)]
    struct MemoryStore {
        tables: parking_lot::Mutex<std::collections::HashMap<String, Vec<String>>>,
        reads: AtomicUsize,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl HistoryStore for MemoryStore {
        fn name(&self) -> &str {
            "memory"
        }

        fn read_all(&self, table: &str) -> Result<Vec<String>, HistoryError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(HistoryError::Io(std::io::Error::other("store offline")));
            }
            Ok(self.tables.lock().get(table).cloned().unwrap_or_default())
        }

        fn write(
            &self,
            table: &str,
            entries: &[String],
            mode: WriteMode,
        ) -> Result<usize, HistoryError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(HistoryError::Io(std::io::Error::other("disk full")));
            }
            let mut tables = self.tables.lock();
            let stored = tables.entry(table.to_string()).or_default();
            if mode == WriteMode::Replace {
                stored.clear();
            }
            let mut written = 0;
            for entry in entries {
                if !stored.contains(entry) {
                    stored.push(entry.clone());
                    written += 1;
                }
            }
            Ok(written)
        }
    }

    fn ledger() -> (History, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let history =
            History::new(&HistoryConfig::in_dir("unused")).with_store("file", store.clone());
        (history, store)
    }

    fn req(spider: &str, url: &str) -> Request {
        Request::get(spider, url).unwrap()
    }

    #[test]
    fn provider_names_fall_back_to_file() {
        assert_eq!(Provider::from("mgo"), Provider::Document);
        assert_eq!(Provider::from("MySQL"), Provider::Relational);
        assert_eq!(Provider::from("csv"), Provider::File);
        assert_eq!(Provider::from(""), Provider::File);
    }

    #[test]
    fn upsert_success_twice_reports_duplicate() {
        let (history, _) = ledger();
        let r = req("news", "https://example.com/1");

        assert!(history.upsert_success(&r));
        assert!(!history.upsert_success(&r));
        assert_eq!(history.counts(), (0, 1, 0));
        assert!(history.has_success(&r));
    }

    #[test]
    fn delete_success_allows_reinsert() {
        let (history, _) = ledger();
        let r = req("news", "https://example.com/1");

        history.upsert_success(&r);
        history.delete_success(&r);
        assert!(history.upsert_success(&r));
    }

    #[test]
    fn inheriting_read_loads_once() {
        let (history, store) = ledger();
        history.read_success("file", true);
        history.read_success("file", true);
        assert_eq!(store.reads.load(Ordering::SeqCst), 1);

        history.read_success("file", false);
        history.read_success("file", true);
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);

        history.empty();
        history.read_success("file", true);
        assert_eq!(store.reads.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn cold_read_clears_everything() {
        let (history, _) = ledger();
        history.upsert_success(&req("news", "https://example.com/1"));
        history.read_success("file", false);
        assert_eq!(history.counts(), (0, 0, 0));
    }

    #[test]
    fn failed_flush_keeps_pending_records() {
        let (history, store) = ledger();
        let r = req("news", "https://example.com/1");
        history.upsert_success(&r);

        store.fail_writes.store(true, Ordering::SeqCst);
        let outcome = history.flush_success("file");
        assert!(!outcome.is_ok());
        assert_eq!(history.counts(), (0, 1, 0));

        store.fail_writes.store(false, Ordering::SeqCst);
        let outcome = history.flush_success("file");
        assert!(outcome.is_ok());
        assert_eq!(outcome.written, 1);
        assert_eq!(history.counts(), (1, 0, 0));

        // Nothing left to write, and the record is still known.
        assert_eq!(history.flush_success("file").written, 0);
        assert!(!history.upsert_success(&r));
    }

    #[test]
    fn failures_pull_per_spider_and_forget_deleted() {
        let (history, _) = ledger();
        let a = req("news", "https://example.com/a");
        let b = req("news", "https://example.com/b");
        let c = req("blog", "https://example.com/c");

        assert!(history.upsert_failure(&a));
        assert!(!history.upsert_failure(&a));
        history.upsert_failure(&b);
        history.upsert_failure(&c);

        let mut pulled: Vec<String> = history
            .pull_failure("news")
            .into_iter()
            .map(|r| r.url.to_string())
            .collect();
        pulled.sort();
        assert_eq!(pulled, vec!["https://example.com/a", "https://example.com/b"]);

        history.delete_failure(&a);
        let pulled = history.pull_failure("news");
        assert_eq!(pulled, vec![b]);
        assert_eq!(history.pull_failure("blog"), vec![c]);
    }

    #[test]
    fn flush_failure_replaces_the_stored_index() {
        let (history, store) = ledger();
        let a = req("news", "https://example.com/a");
        history.upsert_failure(&a);
        assert_eq!(history.flush_failure("file").written, 1);

        history.delete_failure(&a);
        history.flush_failure("file");
        assert!(store.read_all("history_n").unwrap().is_empty());
        assert_eq!(history.provider(), Provider::File);
    }

    #[test]
    fn concurrent_upserts_admit_a_fingerprint_once() {
        let (history, _) = ledger();
        let r = req("news", "https://example.com/1");
        let admitted = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        if history.upsert_success(&r) {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
        assert_eq!(history.counts(), (0, 1, 0));
    }

    #[test]
    fn failure_flush_appends_when_the_stored_index_was_not_loaded() {
        let (history, store) = ledger();
        let kept = req("news", "https://example.com/kept").serialize().unwrap();
        store
            .tables
            .lock()
            .insert("history_n".to_string(), vec![kept.clone()]);

        store.fail_reads.store(true, Ordering::SeqCst);
        history.read_failure("file", true);
        assert!(history.pull_failure("news").is_empty());

        let fresh = req("news", "https://example.com/fresh");
        history.upsert_failure(&fresh);
        let outcome = history.flush_failure("file");
        assert!(outcome.is_ok());
        assert_eq!(outcome.written, 1);

        let stored = store.tables.lock().get("history_n").cloned().unwrap();
        assert_eq!(stored, vec![kept, fresh.serialize().unwrap()]);
    }
}
