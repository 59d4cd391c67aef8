//! Progress sinks.
//!
//! The controller reports progress by calling [`ProgressSink::report`] at
//! fixed points. Delivery is advisory: sinks may drop updates and the
//! pipeline never waits on them.

use tokio::sync::mpsc;
use tracing::debug;

use matchreel_models::ProgressUpdate;

/// Receiver of progress updates.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Sink forwarding updates into a bounded channel.
///
/// A full or closed channel drops the update instead of blocking the run.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::Sender<ProgressUpdate>,
}

impl ChannelProgress {
    pub fn new(tx: mpsc::Sender<ProgressUpdate>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver it feeds.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, update: ProgressUpdate) {
        if let Err(e) = self.tx.try_send(update) {
            debug!("Dropped progress update: {}", e);
        }
    }
}
