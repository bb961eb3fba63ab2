//! Module for tracking in-flight output of a collector.
//!
//! This module defines the `OutputState` struct, which counts output
//! operations that were started and finished for a single collection task:
//! - Docker outputs (batches of items) started and finished.
//! - File outputs started and finished.
//!
//! "Started" is incremented synchronously when an output is triggered and
//! "finished" only once the asynchronous write has ended (successfully or
//! not), so `started == finished` for both kinds means nothing is in flight.
//!
//! It also defines `Intake`, the gate producers pass through while queueing
//! items and files. Once the intake is closed no new send can start, and the
//! collector can wait for the sends already under way to land.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// The kind of output an operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Data,
    File,
}

/// Represents the shared output counters of one collection task.
#[derive(Debug, Default)]
pub struct OutputState {
    /// The number of docker outputs triggered.
    pub data_started: AtomicUsize,
    /// The number of docker outputs that have ended.
    pub data_finished: AtomicUsize,
    /// The number of file outputs triggered.
    pub file_started: AtomicUsize,
    /// The number of file outputs that have ended.
    pub file_finished: AtomicUsize,
    finished: Notify,
}

impl OutputState {
    /// Creates a new, atomically reference-counted `OutputState`.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn start(&self, kind: OutputKind) {
        match kind {
            OutputKind::Data => self.data_started.fetch_add(1, Ordering::SeqCst),
            OutputKind::File => self.file_started.fetch_add(1, Ordering::SeqCst),
        };
    }

    pub(crate) fn finish(&self, kind: OutputKind) {
        match kind {
            OutputKind::Data => self.data_finished.fetch_add(1, Ordering::SeqCst),
            OutputKind::File => self.file_finished.fetch_add(1, Ordering::SeqCst),
        };
        self.finished.notify_waiters();
    }

    /// Checks if every triggered output has ended.
    pub fn is_drained(&self) -> bool {
        self.data_started.load(Ordering::SeqCst) == self.data_finished.load(Ordering::SeqCst)
            && self.file_started.load(Ordering::SeqCst)
                == self.file_finished.load(Ordering::SeqCst)
    }

    /// Waits until every triggered output has ended.
    pub async fn wait_drained(&self) {
        loop {
            // Registered before the check so a finish in between is not missed.
            let finished = self.finished.notified();
            if self.is_drained() {
                return;
            }
            finished.await;
        }
    }

    /// Returns a guard that records the output as finished when dropped.
    pub(crate) fn begin(self: &Arc<Self>, kind: OutputKind) -> FinishGuard {
        self.start(kind);
        FinishGuard {
            state: Arc::clone(self),
            kind,
        }
    }
}

/// Marks an output finished on drop, including when the output task panics.
pub(crate) struct FinishGuard {
    state: Arc<OutputState>,
    kind: OutputKind,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.state.finish(self.kind);
    }
}

/// Counts producer sends in flight and refuses new ones once closed.
#[derive(Debug, Default)]
pub struct Intake {
    closed: AtomicBool,
    in_flight: AtomicUsize,
    settled: Notify,
}

impl Intake {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers a send, or returns `None` if the intake is closed.
    pub(crate) fn enter(self: &Arc<Self>) -> Option<IntakeGuard> {
        // Counted before the check so `close` either sees this send or the send sees `closed`.
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if self.closed.load(Ordering::SeqCst) {
            self.leave();
            return None;
        }
        Some(IntakeGuard {
            intake: Arc::clone(self),
        })
    }

    fn leave(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.settled.notify_waiters();
        }
    }

    /// Refuses every send that has not started yet.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.settled.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closed, with no send still under way.
    pub fn is_settled(&self) -> bool {
        self.is_closed() && self.in_flight.load(Ordering::SeqCst) == 0
    }

    /// Waits until the intake is closed and every admitted send has returned.
    pub async fn wait_settled(&self) {
        loop {
            let settled = self.settled.notified();
            if self.is_settled() {
                return;
            }
            settled.await;
        }
    }
}

/// Keeps a send counted as in flight until dropped.
pub(crate) struct IntakeGuard {
    intake: Arc<Intake>,
}

impl Drop for IntakeGuard {
    fn drop(&mut self) {
        self.intake.leave();
    }
}
