//! # Builder Module
//!
//! Provides the `CollectorBuilder`, a fluent API for constructing and
//! configuring `Collector` instances.
//!
//! ## Overview
//!
//! The builder gathers the collector's sizes, its output sink and the report
//! stream it publishes to. Unset sizes come from [`CollectorConfig::default`];
//! when no output is registered the collector logs its batches through
//! [`LogOutput`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use spider_collector::collector::{report_channel, JsonLinesOutput};
//! use spider_collector::CollectorBuilder;
//!
//! let (reports, report_rx) = report_channel();
//! let mut collector = CollectorBuilder::new()
//!     .docker_capacity(500)
//!     .output(JsonLinesOutput::new("./out"))
//!     .report_sender(reports)
//!     .build()?;
//! collector.init("news", "rust");
//! ```

use crate::collector::{Collector, LogOutput, Output, ReportSender};
use crate::config::CollectorConfig;
use crate::error::CollectorError;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Default)]
pub struct CollectorBuilder {
    config: CollectorConfig,
    output: Option<Arc<dyn Output>>,
    reports: Option<ReportSender>,
}

impl Collector {
    /// Starts a [`CollectorBuilder`].
    pub fn builder() -> CollectorBuilder {
        CollectorBuilder::new()
    }
}

impl CollectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every size at once, typically with a loaded [`CollectorConfig`].
    pub fn config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets how many items a docker holds before it is output.
    pub fn docker_capacity(mut self, capacity: usize) -> Self {
        self.config.docker_capacity = capacity;
        self
    }

    /// Sets how many dockers may exist at once.
    pub fn docker_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.docker_queue_capacity = capacity;
        self
    }

    /// Sets the capacity of the item queue.
    pub fn data_capacity(mut self, capacity: usize) -> Self {
        self.config.data_capacity = capacity;
        self
    }

    /// Sets the capacity of the file queue.
    pub fn file_capacity(mut self, capacity: usize) -> Self {
        self.config.file_capacity = capacity;
        self
    }

    /// Sets the sink the collector writes to.
    pub fn output<O: Output>(mut self, output: O) -> Self {
        self.output = Some(Arc::new(output));
        self
    }

    /// Sets a sink that is shared with other collectors.
    pub fn shared_output(mut self, output: Arc<dyn Output>) -> Self {
        self.output = Some(output);
        self
    }

    /// Sets the report stream the collector publishes to.
    pub fn report_sender(mut self, reports: ReportSender) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Builds the `Collector`. Call [`Collector::init`] before running a task.
    pub fn build(self) -> Result<Collector, CollectorError> {
        let reports = self.reports.ok_or_else(|| {
            CollectorError::Config("a report sender is required".to_string())
        })?;

        // Add a default log output if none is provided
        let output = self.output.unwrap_or_else(|| Arc::new(LogOutput::new()));

        let config = validate(self.config);
        debug!("Building collector with output '{}': {:?}", output.name(), config);
        Ok(Collector::new(config, output, reports))
    }
}

fn validate(mut config: CollectorConfig) -> CollectorConfig {
    for (name, value) in [
        ("docker_capacity", &mut config.docker_capacity),
        ("data_capacity", &mut config.data_capacity),
        ("file_capacity", &mut config.file_capacity),
    ] {
        if *value == 0 {
            warn!("{} must be greater than 0, using 1", name);
            *value = 1;
        }
    }
    if config.docker_queue_capacity < 2 {
        warn!(
            "docker_queue_capacity {} is below the minimum, using 2",
            config.docker_queue_capacity
        );
        config.docker_queue_capacity = 2;
    }
    config
}
