//! # Request Module
//!
//! The request identity used by the history ledger.
//!
//! A [`Request`] serializes to one stable string (JSON of its fields in
//! declaration order). That string is both the stored failure record and the
//! key of the failure index, and it deserializes back into a retryable
//! request. Success records are keyed by [`Record::fingerprint`], a digest of
//! spider, method and URL.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spider_collector::request::{Record, Request};
//!
//! let req = Request::get("news", "https://example.com/a")?;
//! let key = req.serialize()?;
//! assert_eq!(Request::unserialize(&key)?, req);
//! println!("{}", req.fingerprint());
//! ```

use crate::error::HistoryError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Anything that can be recorded as a successful fetch.
pub trait Record {
    fn spider_name(&self) -> &str;
    fn url(&self) -> &str;
    fn method(&self) -> &str;

    /// Stable digest identifying this record in the success set.
    fn fingerprint(&self) -> String {
        let digest = md5::compute(format!(
            "{}\n{}\n{}",
            self.spider_name(),
            self.method().to_ascii_uppercase(),
            self.url()
        ));
        format!("{:x}", digest)
    }
}

/// A crawl request as far as history bookkeeping is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    pub spider: String,
    pub url: Url,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Request {
    /// Creates a request with the given method, upper-cased.
    pub fn new(spider: impl Into<String>, url: Url, method: impl AsRef<str>) -> Self {
        Self {
            spider: spider.into(),
            url,
            method: method.as_ref().to_ascii_uppercase(),
            rule: None,
            body: None,
        }
    }

    /// Parses `url` and creates a `GET` request.
    pub fn get(spider: impl Into<String>, url: &str) -> Result<Self, HistoryError> {
        let url = Url::parse(url).map_err(|e| HistoryError::Request(e.to_string()))?;
        Ok(Self::new(spider, url, "GET"))
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn spider_name(&self) -> &str {
        &self.spider
    }

    /// Serializes the request into its storage key.
    pub fn serialize(&self) -> Result<String, HistoryError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rebuilds a request from a storage key.
    pub fn unserialize(key: &str) -> Result<Self, HistoryError> {
        let req: Request =
            serde_json::from_str(key).map_err(|e| HistoryError::Request(e.to_string()))?;
        if req.spider.is_empty() {
            return Err(HistoryError::Request("missing spider name".into()));
        }
        Ok(req)
    }
}

impl Record for Request {
    fn spider_name(&self) -> &str {
        &self.spider
    }

    fn url(&self) -> &str {
        self.url.as_str()
    }

    fn method(&self) -> &str {
        &self.method
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_key_rebuilds_the_request() {
        let req = Request::get("news", "https://example.com/list?page=2")
            .unwrap()
            .with_rule("list");
        let key = req.serialize().unwrap();
        assert_eq!(key, req.serialize().unwrap());

        let back = Request::unserialize(&key).unwrap();
        assert_eq!(back, req);
        assert_eq!(back.spider_name(), "news");
    }

    #[test]
    fn fingerprint_ignores_method_case_but_not_spider() {
        let url = Url::parse("https://example.com/").unwrap();
        let a = Request::new("news", url.clone(), "get");
        let b = Request::new("news", url.clone(), "GET");
        let c = Request::new("blog", url, "GET");

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn garbage_keys_are_rejected() {
        assert!(Request::unserialize("not json").is_err());
        assert!(Request::unserialize(r#"{"spider":"","url":"https://a.b/","method":"GET"}"#).is_err());
        assert!(Request::unserialize(r#"{"spider":"x","url":"::","method":"GET"}"#).is_err());
    }
}
