//! One-shot shutdown coordination.
//!
//! A single `ShutdownSignal` is created per process run. The first
//! termination signal resolves it; further signals are no-ops, so shutdown
//! logic runs at most once no matter how many interrupts arrive.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            tx: Arc::new(tx),
        }
    }

    /// Requests shutdown. Returns `true` for the first caller only; every
    /// later call is a no-op and returns `false`.
    pub fn request(&self) -> bool {
        let first = self
            .requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if first {
            // Receivers may not exist yet; the watch value itself carries
            // the state for late subscribers.
            let _ = self.tx.send(true);
        }
        first
    }

    /// Resolves once shutdown has been requested. Returns immediately when
    /// the request already happened.
    pub async fn requested(&self) {
        let mut rx = self.tx.subscribe();
        if *rx.borrow() {
            return;
        }
        // The sender lives as long as `self`, so this only errs if every
        // signal handle is gone, in which case no request can arrive either.
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
