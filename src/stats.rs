//! # Statistics Module
//!
//! Running totals of what a collector has handed to its output.
//!
//! ## Overview
//!
//! `CollectStats` keeps three counters per task: the item total before the
//! most recent docker output, the item total after it, and the file total.
//! The difference of the first two is the size of the latest batch, which is
//! what per-output log lines report; the totals end up in the task's
//! [`Report`](crate::collector::Report).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Collects running item and file totals for one task.
#[derive(Debug, Default, serde::Serialize)]
pub struct CollectStats {
    /// Item total before the latest docker output.
    pub previous_data: AtomicU64,
    /// Item total including the latest docker output.
    pub data: AtomicU64,
    /// File total.
    pub files: AtomicU64,
}

impl CollectStats {
    /// Creates a new `CollectStats` with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a docker output of `count` items. Called only by the owning collector.
    pub(crate) fn add_data(&self, count: u64) {
        let previous = self.data.fetch_add(count, Ordering::SeqCst);
        self.previous_data.store(previous, Ordering::SeqCst);
    }

    /// Records one file output.
    pub(crate) fn add_file(&self) {
        self.files.fetch_add(1, Ordering::SeqCst);
    }

    pub fn data_sum(&self) -> u64 {
        self.data.load(Ordering::SeqCst)
    }

    /// Size of the most recent docker output.
    pub fn data_delta(&self) -> u64 {
        self.data_sum() - self.previous_data.load(Ordering::SeqCst)
    }

    pub fn file_sum(&self) -> u64 {
        self.files.load(Ordering::SeqCst)
    }

    /// Converts the counters into a JSON string.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for CollectStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "items: {} (last batch {}), files: {}",
            self.data_sum(),
            self.data_delta(),
            self.file_sum()
        )
    }
}
