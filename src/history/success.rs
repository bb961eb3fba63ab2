//! Fingerprints of requests that completed successfully.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub(crate) struct Success {
    /// Inherited from earlier runs; only replaced wholesale on load.
    old: HashSet<String>,
    /// Completed during this run and not yet flushed.
    new: HashSet<String>,
    pub(crate) inheritable: bool,
}

impl Success {
    pub(crate) fn reset(&mut self, inheritable: bool) {
        self.old = HashSet::new();
        self.new = HashSet::new();
        self.inheritable = inheritable;
    }

    pub(crate) fn load(&mut self, keys: Vec<String>) -> usize {
        self.old.extend(keys);
        self.old.len()
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.old.contains(key) || self.new.contains(key)
    }

    pub(crate) fn upsert(&mut self, key: String) -> bool {
        if self.old.contains(&key) {
            return false;
        }
        self.new.insert(key)
    }

    pub(crate) fn remove(&mut self, key: &str) {
        self.new.remove(key);
        self.old.remove(key);
    }

    /// Entries waiting to be flushed, sorted so writes are reproducible.
    pub(crate) fn pending(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.new.iter().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Marks everything pending as durable.
    pub(crate) fn commit(&mut self) {
        self.old.extend(self.new.drain());
        self.inheritable = true;
    }

    pub(crate) fn len(&self) -> (usize, usize) {
        (self.old.len(), self.new.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_is_idempotent_across_old_and_new() {
        let mut success = Success::default();
        success.load(vec!["a".into()]);

        assert!(!success.upsert("a".into()));
        assert!(success.upsert("b".into()));
        assert!(!success.upsert("b".into()));
        assert_eq!(success.len(), (1, 1));
    }

    #[test]
    fn commit_moves_pending_into_old() {
        let mut success = Success::default();
        success.upsert("b".into());
        success.upsert("a".into());
        assert_eq!(success.pending(), vec!["a", "b"]);

        success.commit();
        assert!(success.pending().is_empty());
        assert!(success.contains("a"));
        assert!(success.inheritable);
    }

    #[test]
    fn remove_clears_both_subsets() {
        let mut success = Success::default();
        success.load(vec!["a".into()]);
        success.upsert("b".into());

        success.remove("a");
        success.remove("b");
        assert_eq!(success.len(), (0, 0));
        assert!(success.upsert("a".into()));
    }
}
