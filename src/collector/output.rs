//! Trait for the sinks a collector writes to.
//!
//! An `Output` receives whole dockers of items and single files. The
//! collector may run several `output_data` calls at once (one per draining
//! docker) alongside `output_file` calls, so implementations must tolerate
//! concurrent use. Errors are logged by the collector; an output that fails
//! still counts as finished.
//!
//! Two outputs ship with the crate:
//! - [`LogOutput`] writes through `tracing`, useful as a default and in dry runs.
//! - [`JsonLinesOutput`] appends items to `<dir>/<spider>__<keyword>.jsonl` and
//!   stores files under `<dir>/<spider>__<keyword>/<rule>/<name>`.

use super::cell::{DataCell, FileCell};
use crate::error::OutputError;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, trace};

/// Identifies the task an output belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputContext {
    pub spider_name: String,
    pub keyword: String,
}

impl OutputContext {
    /// A file-system safe name for this task.
    pub fn file_stem(&self) -> String {
        if self.keyword.is_empty() {
            sanitize(&self.spider_name)
        } else {
            format!("{}__{}", sanitize(&self.spider_name), sanitize(&self.keyword))
        }
    }
}

/// Replaces anything that is not safe in a single path component.
pub(crate) fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.starts_with('.') {
        format!("_{}", cleaned)
    } else {
        cleaned
    }
}

/// The `Output` trait defines the contract for collector sinks.
#[async_trait]
pub trait Output: Send + Sync + 'static {
    /// Returns the name of the output.
    fn name(&self) -> &str;

    /// Writes one docker of items.
    async fn output_data(&self, ctx: &OutputContext, docker: &[DataCell])
        -> Result<(), OutputError>;

    /// Writes one downloaded file.
    async fn output_file(&self, ctx: &OutputContext, file: &FileCell) -> Result<(), OutputError>;
}

/// Logs every batch and file instead of storing them.
#[derive(Debug, Default)]
pub struct LogOutput;

impl LogOutput {
    pub fn new() -> Self {
        LogOutput
    }
}

#[async_trait]
impl Output for LogOutput {
    fn name(&self) -> &str {
        "log"
    }

    async fn output_data(
        &self,
        ctx: &OutputContext,
        docker: &[DataCell],
    ) -> Result<(), OutputError> {
        info!(
            "{} [{}]: output {} items",
            ctx.spider_name,
            ctx.keyword,
            docker.len()
        );
        for cell in docker {
            trace!("{}", serde_json::to_string(cell)?);
        }
        Ok(())
    }

    async fn output_file(&self, ctx: &OutputContext, file: &FileCell) -> Result<(), OutputError> {
        info!(
            "{} [{}]: output file {} ({} bytes)",
            ctx.spider_name,
            ctx.keyword,
            file.name,
            file.bytes.len()
        );
        Ok(())
    }
}

/// Appends items as JSON Lines and writes files to disk.
pub struct JsonLinesOutput {
    dir: PathBuf,
    // Serializes appends so lines from concurrent dockers never interleave.
    write_lock: Mutex<()>,
}

impl JsonLinesOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn data_path(&self, ctx: &OutputContext) -> PathBuf {
        self.dir.join(format!("{}.jsonl", ctx.file_stem()))
    }

    pub fn file_path(&self, ctx: &OutputContext, file: &FileCell) -> PathBuf {
        self.dir
            .join(ctx.file_stem())
            .join(sanitize(&file.rule))
            .join(sanitize(&file.name))
    }
}

#[async_trait]
impl Output for JsonLinesOutput {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn output_data(
        &self,
        ctx: &OutputContext,
        docker: &[DataCell],
    ) -> Result<(), OutputError> {
        let mut buf = Vec::new();
        for cell in docker {
            serde_json::to_writer(&mut buf, cell)?;
            buf.push(b'\n');
        }

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.data_path(ctx))
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        Ok(())
    }

    async fn output_file(&self, ctx: &OutputContext, file: &FileCell) -> Result<(), OutputError> {
        let path = self.file_path(ctx, file);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &file.bytes).await?;
        trace!("Stored file {:?}", path);
        Ok(())
    }
}
