//! A "prelude" for users of the `spider-collector` crate.
//!
//! This prelude re-exports the most commonly used traits, structs, and
//! functions so that they can be easily imported.
//!
//! # Example
//!
//! ```
//! use spider_collector::prelude::*;
//! ```

pub use crate::{
    // Core structs
    Collector,
    CollectorBuilder,
    CollectorHandle,
    History,
    Provider,
    Report,
    Request,
    // Core traits
    Record,
    // Essential re-exports for trait implementation
    async_trait,
};

pub use crate::collector::{
    report_channel, DataCell, FileCell, JsonLinesOutput, LogOutput, Output, OutputContext,
};
pub use crate::error::{CollectorError, HistoryError, OutputError};
