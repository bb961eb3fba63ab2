//! Batch buffers ("dockers") and the queue that rotates them.
//!
//! One docker fills while the others drain. When the current docker is full
//! its items are taken for output and [`DockerQueue::change`] moves to a
//! docker that is neither filling nor draining, creating one if the queue is
//! below capacity and waiting for a [`DockerQueue::release`] otherwise.
//!
//! The docker at `curr` is always filling; a docker is draining from
//! [`DockerQueue::take`] until the matching `release`.

use super::cell::DataCell;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, trace};

/// An ordered batch of items.
pub type Docker = Vec<DataCell>;

struct Slots {
    curr: usize,
    dockers: Vec<Docker>,
    draining: Vec<bool>,
}

impl Slots {
    fn idle(&self) -> Option<usize> {
        (0..self.dockers.len()).find(|&i| i != self.curr && !self.draining[i])
    }
}

pub struct DockerQueue {
    slots: Mutex<Slots>,
    released: Notify,
    cap: usize,
}

impl DockerQueue {
    /// Creates a queue holding at most `cap` dockers (never fewer than two).
    pub fn new(cap: usize) -> Self {
        DockerQueue {
            slots: Mutex::new(Slots {
                curr: 0,
                dockers: vec![Docker::new()],
                draining: vec![false],
            }),
            released: Notify::new(),
            cap: cap.max(2),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Index of the docker currently filling.
    pub fn curr(&self) -> usize {
        self.slots.lock().curr
    }

    /// Appends to the current docker and returns its new length.
    pub fn push(&self, cell: DataCell) -> usize {
        let mut slots = self.slots.lock();
        let curr = slots.curr;
        let docker = &mut slots.dockers[curr];
        docker.push(cell);
        docker.len()
    }

    /// Moves the items of docker `index` out; the slot stays busy until released.
    pub fn take(&self, index: usize) -> Docker {
        let mut slots = self.slots.lock();
        slots.draining[index] = true;
        std::mem::take(&mut slots.dockers[index])
    }

    /// Marks docker `index` idle again once its output has finished.
    pub fn release(&self, index: usize) {
        self.slots.lock().draining[index] = false;
        trace!("Docker {} released", index);
        self.released.notify_one();
    }

    /// Switches the current docker to an idle one.
    pub async fn change(&self) {
        loop {
            {
                let mut slots = self.slots.lock();
                if let Some(idle) = slots.idle() {
                    slots.curr = idle;
                    debug!("Switched to docker {}", idle);
                    return;
                }
                if slots.dockers.len() < self.cap {
                    slots.dockers.push(Docker::new());
                    slots.draining.push(false);
                    slots.curr = slots.dockers.len() - 1;
                    debug!("Opened docker {} of {}", slots.curr, self.cap);
                    return;
                }
            }
            trace!("All {} dockers busy, waiting for a release", self.cap);
            self.released.notified().await;
        }
    }

    /// Number of dockers that are filling or draining.
    pub fn busy(&self) -> usize {
        let slots = self.slots.lock();
        (0..slots.dockers.len())
            .filter(|&i| i == slots.curr || slots.draining[i])
            .count()
    }
}
