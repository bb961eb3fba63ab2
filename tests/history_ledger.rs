use spider_collector::config::HistoryConfig;
use spider_collector::error::HistoryError;
use spider_collector::history::store::{FileStore, HistoryStore, WriteMode};
use spider_collector::history::{History, Provider};
use spider_collector::request::Request;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Wraps a real store and counts how often it is read.
struct CountingStore {
    inner: FileStore,
    reads: AtomicUsize,
}

impl HistoryStore for CountingStore {
    fn name(&self) -> &str {
        "counting"
    }

    fn read_all(&self, table: &str) -> Result<Vec<String>, HistoryError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_all(table)
    }

    fn write(&self, table: &str, entries: &[String], mode: WriteMode) -> Result<usize, HistoryError> {
        self.inner.write(table, entries, mode)
    }
}

fn req(spider: &str, url: &str) -> Request {
    Request::get(spider, url).unwrap()
}

fn urls(mut requests: Vec<Request>) -> Vec<String> {
    requests.sort_by(|a, b| a.url.cmp(&b.url));
    requests.into_iter().map(|r| r.url.to_string()).collect()
}

#[test]
fn inheriting_reads_hit_the_store_once() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(CountingStore {
        inner: FileStore::new(dir.path()),
        reads: AtomicUsize::new(0),
    });
    let history =
        History::new(&HistoryConfig::in_dir(dir.path())).with_store(Provider::File, store.clone());

    history.read_failure("file", true);
    history.read_failure("file", true);
    history.read_failure("csv", true);
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);

    history.empty();
    history.read_failure("file", true);
    assert_eq!(store.reads.load(Ordering::SeqCst), 2);
}

#[test]
fn missing_history_reads_as_empty() {
    let dir = TempDir::new().unwrap();
    let history = History::new(&HistoryConfig::in_dir(dir.path().join("never-created")));

    for provider in ["file", "redb", "sqlite"] {
        history.read_success(provider, true);
        history.read_failure(provider, true);
        assert_eq!(history.counts(), (0, 0, 0));
        assert!(history.pull_failure("news").is_empty());
        history.empty();
    }
}

fn failure_round_trip(provider: Provider) {
    let dir = TempDir::new().unwrap();
    let config = HistoryConfig::in_dir(dir.path());

    let a = req("news", "https://example.com/a");
    let b = req("news", "https://example.com/b").with_rule("detail");
    let c = req("blog", "https://example.com/c").with_body("page=2");

    let first = History::new(&config);
    first.read_failure(provider, true);
    for r in [&a, &b, &c] {
        assert!(first.upsert_failure(r));
    }
    let outcome = first.flush_failure(provider);
    assert!(outcome.is_ok(), "{:?}", outcome.error);
    assert_eq!(outcome.written, 3);

    let second = History::new(&config);
    second.read_failure(provider, true);
    assert_eq!(
        urls(second.pull_failure("news")),
        vec!["https://example.com/a", "https://example.com/b"]
    );
    assert_eq!(second.pull_failure("blog"), vec![c]);

    // A retried request that succeeded is dropped from the stored index.
    second.delete_failure(&a);
    assert!(second.flush_failure(provider).is_ok());

    let third = History::new(&config);
    third.read_failure(provider, true);
    assert_eq!(third.pull_failure("news"), vec![b]);
}

#[test]
fn failure_round_trip_file() {
    failure_round_trip(Provider::File);
}

#[test]
fn failure_round_trip_document() {
    failure_round_trip(Provider::Document);
}

#[test]
fn failure_round_trip_relational() {
    failure_round_trip(Provider::Relational);
}

fn success_round_trip(provider: Provider) {
    let dir = TempDir::new().unwrap();
    let config = HistoryConfig::in_dir(dir.path());
    let a = req("news", "https://example.com/a");
    let b = req("news", "https://example.com/b");

    let first = History::new(&config);
    first.read_success(provider, true);
    assert!(first.upsert_success(&a));
    assert_eq!(first.flush_success(provider).written, 1);

    let second = History::new(&config);
    second.read_success(provider, true);
    assert!(second.has_success(&a));
    assert!(!second.upsert_success(&a));
    assert!(second.upsert_success(&b));
    // Inherited records are appended to, not rewritten.
    assert_eq!(second.flush_success(provider).written, 1);

    let third = History::new(&config);
    third.read_success(provider, true);
    assert_eq!(third.counts(), (2, 0, 0));

    // A cold start overwrites the stored set with this run's records only.
    let cold = History::new(&config);
    cold.read_success(provider, false);
    cold.upsert_success(&b);
    assert!(cold.flush_success(provider).is_ok());

    let last = History::new(&config);
    last.read_success(provider, true);
    assert!(last.has_success(&b));
    assert!(!last.has_success(&a));
}

#[test]
fn success_round_trip_file() {
    success_round_trip(Provider::File);
}

#[test]
fn success_round_trip_document() {
    success_round_trip(Provider::Document);
}

#[test]
fn success_round_trip_relational() {
    success_round_trip(Provider::Relational);
}

#[test]
fn corrupt_file_records_are_skipped() {
    let dir = TempDir::new().unwrap();
    let config = HistoryConfig::in_dir(dir.path());
    let good = req("news", "https://example.com/good");

    let writer = History::new(&config);
    writer.upsert_failure(&good);
    assert!(writer.flush_failure("file").is_ok());

    let path = FileStore::new(dir.path()).path_for(&config.failure_table());
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    // Undecodable line, then a valid JSON string that is not a request.
    writeln!(file, "{{not json").unwrap();
    writeln!(file, "\"just text\"").unwrap();
    drop(file);

    let reader = History::new(&config);
    reader.read_failure("file", true);
    assert_eq!(reader.pull_failure("news"), vec![good]);
    assert_eq!(reader.counts().2, 1);
}
