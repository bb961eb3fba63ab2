//! # spider-collector
//!
//! Collection pipeline and request history of the crawling engine.
//!
//! Provides the per-task [`Collector`], which batches scraped items into
//! dockers and writes them through an [`Output`](collector::Output) while
//! collection continues, and the [`History`] ledger, which remembers which
//! requests succeeded or failed across runs so a crawl can resume.
//!
//! ## Example
//!
//! ```rust,ignore
//! use spider_collector::prelude::*;
//!
//! async fn run() -> Result<(), CollectorError> {
//!     let (reports, report_rx) = report_channel();
//!     let mut collector = Collector::builder()
//!         .docker_capacity(100)
//!         .output(JsonLinesOutput::new("./out"))
//!         .report_sender(reports)
//!         .build()?;
//!
//!     collector.init("news", "rust");
//!     let handle = collector.handle();
//!     tokio::spawn(async move {
//!         // spider workers call handle.collect_data(..) here
//!         handle.request_shutdown();
//!     });
//!
//!     let report = collector.manage().await;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod collector;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod prelude;
pub mod request;
pub mod state;
pub mod stats;

pub use builder::CollectorBuilder;
pub use collector::{Collector, CollectorHandle, Report};
pub use config::{CollectorConfig, CoreConfig, HistoryConfig};
pub use history::{FlushOutcome, History, Provider};
pub use request::{Record, Request};

pub use async_trait::async_trait;
pub use tokio;
