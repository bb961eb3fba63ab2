//! The per-task completion report and the channel that carries it.

use kanal::{unbounded_async, AsyncReceiver, AsyncSender};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Emitted exactly once per task, after all of its output has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub spider_name: String,
    pub keyword: String,
    /// Items handed to the output.
    pub data_num: u64,
    /// Files handed to the output.
    pub file_num: u64,
    /// Wall time since the task was initialized.
    pub elapsed: Duration,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = if self.keyword.is_empty() {
            String::new()
        } else {
            format!(" [{}]", self.keyword)
        };
        write!(
            f,
            "{}{}: {} items, {} files in {:?}",
            self.spider_name, keyword, self.data_num, self.file_num, self.elapsed
        )
    }
}

pub type ReportSender = AsyncSender<Report>;
pub type ReportReceiver = AsyncReceiver<Report>;

/// Creates the report stream shared by every collector of a process.
pub fn report_channel() -> (ReportSender, ReportReceiver) {
    unbounded_async()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_keyword_only_when_set() {
        let mut report = Report {
            spider_name: "news".into(),
            keyword: String::new(),
            data_num: 7,
            file_num: 1,
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(report.to_string(), "news: 7 items, 1 files in 1.5s");

        report.keyword = "rust".into();
        assert_eq!(report.to_string(), "news [rust]: 7 items, 1 files in 1.5s");
    }
}
