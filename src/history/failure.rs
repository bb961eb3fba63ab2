//! Failed requests grouped by the spider that issued them.

use crate::request::Request;
use std::collections::{HashMap, HashSet};
use tracing::warn;

#[derive(Debug, Default)]
pub(crate) struct Failure {
    list: HashMap<String, HashSet<String>>,
    pub(crate) inheritable: bool,
    /// The last inheriting load hit a backend error, so durable state is unknown.
    pub(crate) load_failed: bool,
}

impl Failure {
    pub(crate) fn reset(&mut self, inheritable: bool) {
        self.list = HashMap::new();
        self.inheritable = inheritable;
        self.load_failed = false;
    }

    /// Indexes stored records; returns `(loaded, skipped)`.
    pub(crate) fn load(&mut self, records: Vec<String>) -> (usize, usize) {
        let mut loaded = 0;
        let mut skipped = 0;
        for record in records {
            // Re-serialize so keys match what `Request::serialize` produces for deletes.
            let decoded = Request::unserialize(&record)
                .and_then(|req| req.serialize().map(|key| (req.spider, key)));
            let (spider, key) = match decoded {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("Skipping undecodable failure record: {}", e);
                    skipped += 1;
                    continue;
                }
            };
            if self.upsert(spider, key) {
                loaded += 1;
            }
        }
        (loaded, skipped)
    }

    pub(crate) fn upsert(&mut self, spider: String, key: String) -> bool {
        self.list.entry(spider).or_default().insert(key)
    }

    pub(crate) fn remove(&mut self, spider: &str, key: &str) {
        if let Some(keys) = self.list.get_mut(spider) {
            keys.remove(key);
            if keys.is_empty() {
                self.list.remove(spider);
            }
        }
    }

    pub(crate) fn pull(&self, spider: &str) -> Vec<Request> {
        let Some(keys) = self.list.get(spider) else {
            return Vec::new();
        };
        keys.iter()
            .filter_map(|key| match Request::unserialize(key) {
                Ok(req) => Some(req),
                Err(e) => {
                    warn!("Dropping unreadable failure record for {}: {}", spider, e);
                    None
                }
            })
            .collect()
    }

    /// Every record across all spiders, sorted so writes are reproducible.
    pub(crate) fn entries(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.list.values().flatten().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub(crate) fn len(&self) -> usize {
        self.list.values().map(HashSet::len).sum()
    }
}
