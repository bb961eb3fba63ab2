//! The per-task collector.
//!
//! A `Collector` receives items and files from spider workers over two bounded
//! queues, batches items into dockers, dispatches each full docker to the
//! output on its own task, and reports once everything it dispatched has
//! finished. The same value is reused across tasks through [`Collector::init`].

use super::cell::{DataCell, FileCell};
use super::docker::DockerQueue;
use super::output::{Output, OutputContext};
use super::report::{Report, ReportSender};
use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::state::{Intake, OutputKind, OutputState};
use crate::stats::CollectStats;
use kanal::{bounded_async, AsyncReceiver, AsyncSender};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Cloneable producer side of a collector, handed to spider workers.
#[derive(Clone)]
pub struct CollectorHandle {
    data_tx: AsyncSender<DataCell>,
    file_tx: AsyncSender<FileCell>,
    shutdown: Arc<watch::Sender<bool>>,
    intake: Arc<Intake>,
}

impl CollectorHandle {
    /// Queues one item, waiting while the item queue is full.
    ///
    /// `Ok` means the item will be output; once the task is finishing, sends
    /// fail with [`CollectorError::Closed`].
    pub async fn collect_data(&self, cell: DataCell) -> Result<(), CollectorError> {
        let _entry = self.intake.enter().ok_or(CollectorError::Closed("data"))?;
        self.data_tx
            .send(cell)
            .await
            .map_err(|_| CollectorError::Closed("data"))
    }

    /// Queues one file, waiting while the file queue is full.
    pub async fn collect_file(&self, file: FileCell) -> Result<(), CollectorError> {
        let _entry = self.intake.enter().ok_or(CollectorError::Closed("file"))?;
        self.file_tx
            .send(file)
            .await
            .map_err(|_| CollectorError::Closed("file"))
    }

    /// Asks the collector to finish once its queues are empty.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Batches the output of one crawl task.
pub struct Collector {
    config: CollectorConfig,
    output: Arc<dyn Output>,
    reports: ReportSender,
    context: Arc<OutputContext>,
    dockers: Arc<DockerQueue>,
    data_tx: AsyncSender<DataCell>,
    data_rx: AsyncReceiver<DataCell>,
    file_tx: AsyncSender<FileCell>,
    file_rx: AsyncReceiver<FileCell>,
    shutdown: Arc<watch::Sender<bool>>,
    intake: Arc<Intake>,
    state: Arc<OutputState>,
    stats: Arc<CollectStats>,
    started_at: Instant,
}

impl Collector {
    /// Creates a collector; call [`Collector::init`] before each task.
    pub fn new(config: CollectorConfig, output: Arc<dyn Output>, reports: ReportSender) -> Self {
        let (data_tx, data_rx) = bounded_async(config.data_capacity);
        let (file_tx, file_rx) = bounded_async(config.file_capacity);
        let (shutdown, _) = watch::channel(false);
        Collector {
            dockers: Arc::new(DockerQueue::new(config.docker_queue_capacity)),
            config,
            output,
            reports,
            context: Arc::new(OutputContext::default()),
            data_tx,
            data_rx,
            file_tx,
            file_rx,
            shutdown: Arc::new(shutdown),
            intake: Intake::new(),
            state: OutputState::new(),
            stats: Arc::new(CollectStats::new()),
            started_at: Instant::now(),
        }
    }

    /// Re-arms queues, dockers, counters and the clock for a new task.
    ///
    /// Handles taken before this call belong to the previous task.
    pub fn init(&mut self, spider_name: impl Into<String>, keyword: impl Into<String>) {
        let (data_tx, data_rx) = bounded_async(self.config.data_capacity);
        let (file_tx, file_rx) = bounded_async(self.config.file_capacity);
        let (shutdown, _) = watch::channel(false);

        self.context = Arc::new(OutputContext {
            spider_name: spider_name.into(),
            keyword: keyword.into(),
        });
        self.dockers = Arc::new(DockerQueue::new(self.config.docker_queue_capacity));
        self.data_tx = data_tx;
        self.data_rx = data_rx;
        self.file_tx = file_tx;
        self.file_rx = file_rx;
        self.shutdown = Arc::new(shutdown);
        self.intake = Intake::new();
        self.state = OutputState::new();
        self.stats = Arc::new(CollectStats::new());
        self.started_at = Instant::now();

        debug!(
            "Collector armed for {} [{}] with docker capacity {}",
            self.context.spider_name, self.context.keyword, self.config.docker_capacity
        );
    }

    /// A producer handle for the current task.
    pub fn handle(&self) -> CollectorHandle {
        CollectorHandle {
            data_tx: self.data_tx.clone(),
            file_tx: self.file_tx.clone(),
            shutdown: Arc::clone(&self.shutdown),
            intake: Arc::clone(&self.intake),
        }
    }

    pub async fn collect_data(&self, cell: DataCell) -> Result<(), CollectorError> {
        self.handle().collect_data(cell).await
    }

    pub async fn collect_file(&self, file: FileCell) -> Result<(), CollectorError> {
        self.handle().collect_file(file).await
    }

    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn spider_name(&self) -> &str {
        &self.context.spider_name
    }

    pub fn keyword(&self) -> &str {
        &self.context.keyword
    }

    /// Items handed to the output so far in this task.
    pub fn data_sum(&self) -> u64 {
        self.stats.data_sum()
    }

    /// Size of the most recent docker output.
    pub fn data_delta(&self) -> u64 {
        self.stats.data_delta()
    }

    /// Files handed to the output so far in this task.
    pub fn file_sum(&self) -> u64 {
        self.stats.file_sum()
    }

    /// Runs the task until shutdown is requested and everything queued is written.
    ///
    /// Every item whose send returned `Ok` is output. Returns the report that
    /// was also sent on the report stream.
    pub async fn manage(&mut self) -> Report {
        info!(
            "Collector started for {} [{}]",
            self.context.spider_name, self.context.keyword
        );

        let file_worker = self.spawn_file_worker();
        let mut shutdown_rx = self.shutdown.subscribe();

        // Kept alive across iterations: a dropped pending receive loses the item handed to it.
        let recv = self.data_rx.recv();
        tokio::pin!(recv);
        let mut open = true;

        loop {
            tokio::select! {
                biased;
                data = &mut recv => match data {
                    Ok(cell) => {
                        recv.set(self.data_rx.recv());
                        self.docker_one(cell).await;
                    }
                    Err(_) => {
                        warn!("Item queue closed before shutdown was requested");
                        open = false;
                        break;
                    }
                },
                _ = shutdown_requested(&mut shutdown_rx) => {
                    if self.data_rx.is_empty() {
                        break;
                    }
                }
            }
        }

        // No new sends from here on; take in the ones already under way.
        self.intake.close();
        while open {
            tokio::select! {
                biased;
                data = &mut recv => match data {
                    Ok(cell) => {
                        recv.set(self.data_rx.recv());
                        self.docker_one(cell).await;
                    }
                    Err(_) => open = false,
                },
                _ = self.intake.wait_settled() => {
                    if self.data_rx.is_empty() {
                        break;
                    }
                }
            }
        }

        let _ = self.data_rx.close();
        if open {
            // Closing ends the pending receive, unless a sender handed it an item first.
            if let Ok(cell) = recv.await {
                self.docker_one(cell).await;
            }
        }
        trace!("Item queue drained, flushing the current docker");
        self.go_output(self.dockers.curr());

        if let Err(e) = file_worker.await {
            error!("File output worker failed: {}", e);
        }
        self.state.wait_drained().await;

        self.report().await
    }

    async fn docker_one(&self, cell: DataCell) {
        let len = self.dockers.push(cell);
        trace!("Docker {} holds {} items", self.dockers.curr(), len);
        if len >= self.config.docker_capacity {
            self.go_output(self.dockers.curr());
            self.dockers.change().await;
        }
    }

    /// Dispatches docker `index` to the output on its own task.
    fn go_output(&self, index: usize) {
        let docker = self.dockers.take(index);
        if docker.is_empty() {
            self.dockers.release(index);
            return;
        }

        let guard = self.state.begin(OutputKind::Data);
        self.stats.add_data(docker.len() as u64);
        debug!(
            "Output docker {} with {} items ({} so far, {} of {} dockers busy)",
            index,
            self.stats.data_delta(),
            self.stats.data_sum(),
            self.dockers.busy(),
            self.dockers.cap()
        );

        let output = Arc::clone(&self.output);
        let context = Arc::clone(&self.context);
        let dockers = Arc::clone(&self.dockers);
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = output.output_data(&context, &docker).await {
                error!(
                    "Output '{}' failed to write {} items for {}: {}",
                    output.name(),
                    docker.len(),
                    context.spider_name,
                    e
                );
            }
            drop(docker);
            dockers.release(index);
        });
    }

    fn spawn_file_worker(&self) -> tokio::task::JoinHandle<()> {
        let file_rx = self.file_rx.clone();
        let intake = Arc::clone(&self.intake);
        let output = Arc::clone(&self.output);
        let context = Arc::clone(&self.context);
        let state = Arc::clone(&self.state);
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            let recv = file_rx.recv();
            tokio::pin!(recv);
            let mut open = true;

            while open {
                tokio::select! {
                    biased;
                    file = &mut recv => match file {
                        Ok(file) => {
                            recv.set(file_rx.recv());
                            go_file_output(file, &output, &context, &state, &stats);
                        }
                        Err(_) => open = false,
                    },
                    _ = intake.wait_settled() => {
                        if file_rx.is_empty() {
                            break;
                        }
                    }
                }
            }

            let _ = file_rx.close();
            if open {
                if let Ok(file) = recv.await {
                    go_file_output(file, &output, &context, &state, &stats);
                }
            }
            trace!("File worker for {} finished", context.spider_name);
        })
    }

    async fn report(&self) -> Report {
        let report = Report {
            spider_name: self.context.spider_name.clone(),
            keyword: self.context.keyword.clone(),
            data_num: self.stats.data_sum(),
            file_num: self.stats.file_sum(),
            elapsed: self.started_at.elapsed(),
        };
        info!("Collector finished: {}", report);
        if self.reports.send(report.clone()).await.is_err() {
            warn!("Report stream closed, report for {} not delivered", report.spider_name);
        }
        report
    }
}

/// Resolves once shutdown was requested, or when the flag can no longer change.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|requested| *requested).await;
}

fn go_file_output(
    file: FileCell,
    output: &Arc<dyn Output>,
    context: &Arc<OutputContext>,
    state: &Arc<OutputState>,
    stats: &Arc<CollectStats>,
) {
    let guard = state.begin(OutputKind::File);
    stats.add_file();

    let output = Arc::clone(output);
    let context = Arc::clone(context);
    tokio::spawn(async move {
        let _guard = guard;
        if let Err(e) = output.output_file(&context, &file).await {
            error!(
                "Output '{}' failed to write file {} for {}: {}",
                output.name(),
                file.name,
                context.spider_name,
                e
            );
        }
    });
}
