//! # Span Buffer
//!
//! Collects ended root spans and hands them to a [`SpanPublisher`] in batches.
//!
//! A batch is published when the buffer holds `max_spans` root spans, when the
//! optional flush interval elapses, or when [`SpanBuffer::flush`] is called.
//! The pending batch is swapped out under the same lock that guards appends,
//! so every span lands in exactly one batch.

use super::span::RootSpan;
use super::SpanPublisher;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Receives span lifecycle notifications from the host tracer.
pub trait SpanListener: Send + Sync {
    fn on_start_span(&self, _root: &RootSpan) {}

    fn on_end_span(&self, root: RootSpan);
}

/// Flush thresholds. There are no built-in defaults; the host picks both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Number of buffered root spans that triggers a flush.
    pub max_spans: usize,
    pub flush_interval: Option<Duration>,
}

impl BufferConfig {
    pub fn new(max_spans: usize) -> Self {
        Self {
            max_spans,
            flush_interval: None,
        }
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }
}

struct Inner {
    pending: Mutex<Vec<RootSpan>>,
    publisher: Arc<dyn SpanPublisher>,
    max_spans: usize,
}

impl Inner {
    fn push(&self, root: RootSpan) {
        let batch = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.push(root);
            if pending.len() >= self.max_spans {
                Some(std::mem::take(&mut *pending))
            } else {
                None
            }
        };
        if let Some(batch) = batch {
            self.publish(batch, "size");
        }
    }

    fn take(&self) -> Vec<RootSpan> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *pending)
    }

    fn publish(&self, batch: Vec<RootSpan>, trigger: &'static str) {
        if batch.is_empty() {
            return;
        }
        let roots = batch.len();
        let spans: usize = batch.iter().map(RootSpan::len).sum();
        debug!(roots, spans, trigger, "Flushing span buffer");
        if let Err(e) = self.publisher.publish(batch) {
            warn!(roots, trigger, error = %e, "Dropped span batch");
        }
    }
}

pub struct SpanBuffer {
    inner: Arc<Inner>,
    flusher: Option<JoinHandle<()>>,
}

impl SpanBuffer {
    /// Creates a buffer publishing to `publisher`.
    ///
    /// The interval flush needs a tokio runtime and a non-zero interval.
    /// Otherwise the buffer only flushes on size and on explicit
    /// [`SpanBuffer::flush`] calls.
    pub fn new(config: BufferConfig, publisher: Arc<dyn SpanPublisher>) -> Self {
        let inner = Arc::new(Inner {
            pending: Mutex::new(Vec::new()),
            publisher,
            max_spans: config.max_spans,
        });

        let flusher = config.flush_interval.and_then(|period| {
            if period.is_zero() {
                warn!("Zero flush interval, interval flush disabled");
                return None;
            }
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => Some(handle.spawn(run_flusher(Arc::downgrade(&inner), period))),
                Err(_) => {
                    warn!(?period, "No async runtime, interval flush disabled");
                    None
                }
            }
        });

        Self { inner, flusher }
    }

    /// Publishes whatever is pending, if anything.
    pub fn flush(&self) {
        let batch = self.inner.take();
        self.inner.publish(batch, "manual");
    }

    /// True while the interval flush task is running.
    pub fn has_interval_flush(&self) -> bool {
        self.flusher
            .as_ref()
            .is_some_and(|flusher| !flusher.is_finished())
    }

    /// Number of root spans waiting for the next flush.
    pub fn len(&self) -> usize {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SpanListener for SpanBuffer {
    fn on_end_span(&self, root: RootSpan) {
        self.inner.push(root);
    }
}

impl Drop for SpanBuffer {
    fn drop(&mut self) {
        if let Some(flusher) = self.flusher.take() {
            flusher.abort();
        }
    }
}

async fn run_flusher(inner: Weak<Inner>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(buffer) = inner.upgrade() else {
            break;
        };
        let batch = buffer.take();
        buffer.publish(batch, "interval");
    }
}
