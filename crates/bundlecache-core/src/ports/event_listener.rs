//! Event listener port.
//!
//! Listeners are called from the event dispatcher, never from the call that
//! produced the event. A listener must not block; it should hand the event
//! off (channel, UI queue) and return.

use tokio::sync::mpsc;

use crate::events::BundleEvent;

/// Receiver of bundle lifecycle events.
///
/// Implemented for any `Fn(&BundleEvent) + Send + Sync` closure, so simple
/// listeners can be registered inline:
///
/// ```ignore
/// cache.subscribe(|event: &BundleEvent| tracing::info!(?event, "bundle event"));
/// ```
pub trait BundleEventListener: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &BundleEvent);
}

impl<F> BundleEventListener for F
where
    F: Fn(&BundleEvent) + Send + Sync,
{
    fn on_event(&self, event: &BundleEvent) {
        self(event);
    }
}

/// Listener that forwards every event into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<BundleEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BundleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl BundleEventListener for ChannelListener {
    fn on_event(&self, event: &BundleEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(event.clone());
    }
}
