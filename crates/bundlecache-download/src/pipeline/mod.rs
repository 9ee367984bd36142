//! Deferred event delivery.
//!
//! `emit` only appends to a pending list; a dispatcher task flushes the list
//! to every listener later, so listeners never run inside the call that
//! produced the event. Events emitted in one burst (no await in between) are
//! delivered in a single flush, in emission order.
//!
//! Pending events for a bundle can be dropped with `purge` before they are
//! delivered. The scheduler uses this when it cancels a bundle's task.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use bundlecache_core::{BundleEvent, BundleEventListener};

struct Shared {
    pending: Mutex<VecDeque<BundleEvent>>,
    listeners: RwLock<Vec<Arc<dyn BundleEventListener>>>,
    wake: Notify,
    flushes: AtomicUsize,
}

/// Event pipeline with a single dispatcher task.
///
/// The dispatcher is aborted when the pipeline is dropped; undelivered
/// events are discarded.
pub struct EventPipeline {
    shared: Arc<Shared>,
    dispatcher: JoinHandle<()>,
}

impl EventPipeline {
    /// Start the pipeline. Must be called from within a tokio runtime.
    pub fn start() -> Self {
        let shared = Arc::new(Shared {
            pending: Mutex::new(VecDeque::new()),
            listeners: RwLock::new(Vec::new()),
            wake: Notify::new(),
            flushes: AtomicUsize::new(0),
        });
        let dispatcher = tokio::spawn(dispatch_loop(Arc::clone(&shared)));
        Self { shared, dispatcher }
    }

    /// Register a listener. Listeners are never removed.
    pub fn subscribe(&self, listener: Arc<dyn BundleEventListener>) {
        self.shared
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Queue an event for delivery.
    pub fn emit(&self, event: BundleEvent) {
        tracing::trace!(target: "bundlecache.events", ?event, "Event queued");
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event);
        self.shared.wake.notify_one();
    }

    /// Drop every undelivered event about `bundle_name`.
    ///
    /// Global events (`busy`, `not_busy`) are kept. Returns the number of
    /// events dropped.
    pub fn purge(&self, bundle_name: &str) -> usize {
        let mut pending = self
            .shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = pending.len();
        pending.retain(|event| event.bundle_name() != Some(bundle_name));
        let dropped = before - pending.len();
        if dropped > 0 {
            tracing::debug!(
                target: "bundlecache.events",
                bundle = bundle_name,
                dropped,
                "Purged undelivered events"
            );
        }
        dropped
    }

    /// Number of events waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of non-empty flushes performed so far.
    pub fn flush_count(&self) -> usize {
        self.shared.flushes.load(Ordering::Relaxed)
    }
}

impl Drop for EventPipeline {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

async fn dispatch_loop(shared: Arc<Shared>) {
    loop {
        shared.wake.notified().await;

        // Let the producing burst finish before flushing
        tokio::task::yield_now().await;

        let batch: Vec<BundleEvent> = shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        if batch.is_empty() {
            continue;
        }

        let listeners = shared
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        shared.flushes.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(
            target: "bundlecache.events",
            events = batch.len(),
            listeners = listeners.len(),
            "Flushing events"
        );
        for event in &batch {
            for listener in &listeners {
                listener.on_event(event);
            }
        }
    }
}
