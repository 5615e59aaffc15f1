use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

/// One registered unit of pending work.
///
/// Every ticket holds a sender of the result channel: the channel closes when the
/// last sender, hence the last ticket, is dropped. The shared counter mirrors the
/// number of live tickets and is only read for diagnostics.
#[derive(Debug)]
pub struct Ticket<T> {
    tx: mpsc::UnboundedSender<T>,
    pending: Arc<AtomicUsize>,
}

impl<T> Ticket<T> {
    /// Registers the root unit of work, along with the channel it reports to.
    pub fn root() -> (Self, mpsc::UnboundedReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let ticket = Self {
            tx,
            pending: Arc::new(AtomicUsize::new(1)),
        };
        (ticket, rx)
    }

    /// Registers a new unit of work, it must be issued before `self` is dropped.
    pub fn child(&self) -> Self {
        self.pending.fetch_add(1, Ordering::SeqCst);
        Self {
            tx: self.tx.clone(),
            pending: self.pending.clone(),
        }
    }

    pub fn send(&self, item: T) {
        if self.tx.send(item).is_err() {
            log::debug!("Result stream dropped, discarding outcome");
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl<T> Drop for Ticket<T> {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            log::debug!("No pending work left, last result sender going away");
        }
    }
}
