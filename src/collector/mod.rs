//! # Collector Module
//!
//! The collection pipeline of a crawl task.
//!
//! ## Overview
//!
//! Spider workers hand scraped items ([`DataCell`]) and downloaded files
//! ([`FileCell`]) to a [`Collector`] through a cloneable [`CollectorHandle`].
//! The collector batches items into dockers, writes full dockers through an
//! [`Output`] on separate tasks so collection never waits on storage, and
//! emits one [`Report`] per task after every output it started has ended.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spider_collector::collector::{report_channel, Collector, DataCell, LogOutput};
//! use spider_collector::config::CollectorConfig;
//! use std::sync::Arc;
//!
//! let (reports, report_rx) = report_channel();
//! let mut collector = Collector::new(CollectorConfig::default(), Arc::new(LogOutput), reports);
//! collector.init("news", "rust");
//!
//! let handle = collector.handle();
//! tokio::spawn(async move {
//!     handle.collect_data(DataCell::new("list", Default::default())).await?;
//!     handle.request_shutdown();
//!     Ok::<_, spider_collector::error::CollectorError>(())
//! });
//!
//! let report = collector.manage().await;
//! ```

mod cell;
mod core;
mod docker;
mod output;
mod report;

pub use self::cell::{DataCell, FileCell};
pub use self::core::{Collector, CollectorHandle};
pub use self::docker::{Docker, DockerQueue};
pub use self::output::{JsonLinesOutput, LogOutput, Output, OutputContext};
pub use self::report::{report_channel, Report, ReportReceiver, ReportSender};
