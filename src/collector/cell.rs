//! Units of collected output: scraped items and downloaded files.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One scraped item, opaque to the collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataCell {
    /// Name of the rule that produced the item.
    pub rule: String,
    pub data: Map<String, Value>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub parent_url: String,
    /// When the source page was fetched, as formatted by the spider.
    #[serde(default)]
    pub downloaded_at: String,
}

impl DataCell {
    pub fn new(rule: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            rule: rule.into(),
            data,
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>, parent_url: impl Into<String>) -> Self {
        self.url = url.into();
        self.parent_url = parent_url.into();
        self
    }
}

/// One downloaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCell {
    pub rule: String,
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileCell {
    pub fn new(rule: impl Into<String>, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            rule: rule.into(),
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}
