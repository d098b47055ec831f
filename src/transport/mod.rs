//! # Queued Transport
//!
//! A [`Transport`] that never blocks the caller. `send` enqueues the event on an
//! unbounded channel and returns. A [`TransportWorker`] task owns the receiving
//! end and starts one delivery per event on the configured [`EventSink`], so a
//! stalled delivery does not hold back the ones behind it.
//!
//! ```ignore
//! let (transport, worker) = QueuedTransport::new(TransportMode::Ipc, None, Arc::new(LoggingSink));
//! tokio::spawn(worker.run());
//!
//! transport.send("trace-span", payload)?;
//! transport.flush().await?;
//! transport.destroy();
//! ```

pub mod message;
pub mod sink;

pub use message::TransportRequest;
pub use sink::{EventSink, LoggingSink};

use crate::config::ApmOptions;
use crate::services::{Transport, TransportError, TransportMode};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Client half: cheap to share, implements [`Transport`].
pub struct QueuedTransport {
    sender: Mutex<Option<mpsc::UnboundedSender<TransportRequest>>>,
    mode: TransportMode,
    options: Option<ApmOptions>,
}

impl QueuedTransport {
    pub fn new(
        mode: TransportMode,
        options: Option<ApmOptions>,
        sink: Arc<dyn EventSink>,
    ) -> (Self, TransportWorker) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let transport = Self {
            sender: Mutex::new(Some(sender)),
            mode,
            options,
        };
        let worker = TransportWorker {
            receiver,
            sink,
            mode,
        };
        (transport, worker)
    }

    /// Creates the transport and spawns its worker on the current runtime.
    pub fn spawn(
        mode: TransportMode,
        options: Option<ApmOptions>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (transport, worker) = Self::new(mode, options, sink);
        tokio::spawn(worker.run());
        transport
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn options(&self) -> Option<&ApmOptions> {
        self.options.as_ref()
    }

    fn enqueue(&self, request: TransportRequest) -> Result<(), TransportError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        sender
            .as_ref()
            .ok_or(TransportError::Closed)?
            .send(request)
            .map_err(|_| TransportError::Closed)
    }

    /// Waits until every event sent before this call has been delivered.
    pub async fn flush(&self) -> Result<(), TransportError> {
        let (respond_to, response) = oneshot::channel();
        self.enqueue(TransportRequest::Flush { respond_to })?;
        response.await.map_err(|_| TransportError::Closed)
    }
}

impl Transport for QueuedTransport {
    fn send(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        self.enqueue(TransportRequest::Send {
            event: event.to_string(),
            payload,
        })
    }

    fn destroy(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            debug!(mode = %self.mode, "Transport closed");
        }
    }
}

/// Server half: owns the queue and the in-flight deliveries.
pub struct TransportWorker {
    receiver: mpsc::UnboundedReceiver<TransportRequest>,
    sink: Arc<dyn EventSink>,
    mode: TransportMode,
}

impl TransportWorker {
    /// Processes requests until the transport is destroyed, then waits for the
    /// remaining deliveries.
    pub async fn run(mut self) {
        let mode = self.mode.as_str();
        info!(mode, "Transport started");

        let mut in_flight = JoinSet::new();
        let mut accepted = 0usize;

        while let Some(request) = self.receiver.recv().await {
            match request {
                TransportRequest::Send { event, payload } => {
                    accepted += 1;
                    let sink = self.sink.clone();
                    in_flight.spawn(async move {
                        if let Err(e) = sink.deliver(&event, payload).await {
                            warn!(mode, %event, error = %e, "Delivery failed");
                        }
                    });
                    while in_flight.try_join_next().is_some() {}
                }
                TransportRequest::Flush { respond_to } => {
                    let pending = std::mem::take(&mut in_flight);
                    debug!(mode, pending = pending.len(), "Flush");
                    tokio::spawn(async move {
                        drain(pending).await;
                        let _ = respond_to.send(());
                    });
                }
            }
        }

        drain(in_flight).await;
        info!(mode, accepted, "Shutdown");
    }
}

async fn drain(mut deliveries: JoinSet<()>) {
    while let Some(result) = deliveries.join_next().await {
        if let Err(e) = result {
            warn!(error = %e, "Delivery task aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Recording {
        delivered: Mutex<Vec<String>>,
        delivered_signal: Notify,
        release: Notify,
    }

    impl Recording {
        fn delivered(&self) -> Vec<String> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventSink for Recording {
        async fn deliver(&self, event: &str, _payload: Value) -> Result<(), TransportError> {
            match event {
                "stall" => self.release.notified().await,
                "broken" => return Err(TransportError::Delivery("connection reset".into())),
                _ => {}
            }
            self.delivered.lock().unwrap().push(event.to_string());
            self.delivered_signal.notify_one();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_flush_waits_for_every_event() {
        let sink = Arc::new(Recording::default());
        let transport = QueuedTransport::spawn(TransportMode::Ipc, None, sink.clone());

        for n in 0..10 {
            transport.send(&format!("event-{}", n), json!({ "n": n })).unwrap();
        }
        transport.flush().await.unwrap();

        let mut delivered = sink.delivered();
        delivered.sort();
        assert_eq!(delivered.len(), 10);
        assert_eq!(delivered[0], "event-0");
    }

    #[tokio::test]
    async fn test_stalled_delivery_does_not_block_next() {
        let sink = Arc::new(Recording::default());
        let transport = QueuedTransport::spawn(TransportMode::Websocket, None, sink.clone());

        transport.send("stall", json!({})).unwrap();
        transport.send("quick", json!({})).unwrap();

        tokio::time::timeout(Duration::from_secs(2), sink.delivered_signal.notified())
            .await
            .expect("quick event should not wait behind the stalled one");
        assert_eq!(sink.delivered(), vec!["quick"]);

        sink.release.notify_one();
        transport.flush().await.unwrap();
        assert_eq!(sink.delivered(), vec!["quick", "stall"]);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_propagated() {
        let sink = Arc::new(Recording::default());
        let transport = QueuedTransport::spawn(TransportMode::Ipc, None, sink.clone());

        assert!(transport.send("broken", json!({})).is_ok());
        transport.send("fine", json!({})).unwrap();
        transport.flush().await.unwrap();

        assert_eq!(sink.delivered(), vec!["fine"]);
    }

    #[tokio::test]
    async fn test_send_after_destroy_is_closed() {
        let sink = Arc::new(Recording::default());
        let (transport, worker) = QueuedTransport::new(TransportMode::Ipc, None, sink.clone());
        let handle = tokio::spawn(worker.run());

        transport.send("before", json!({})).unwrap();
        transport.destroy();
        transport.destroy();

        assert_eq!(transport.send("after", json!({})), Err(TransportError::Closed));
        assert_eq!(transport.flush().await, Err(TransportError::Closed));

        handle.await.unwrap();
        assert_eq!(sink.delivered(), vec!["before"]);
    }

    #[test]
    fn test_carries_mode_and_options() {
        let options = ApmOptions {
            secret_key: "s".into(),
            public_key: "p".into(),
            app_name: "checkout".into(),
        };
        let (transport, _worker) = QueuedTransport::new(
            TransportMode::Websocket,
            Some(options.clone()),
            Arc::new(LoggingSink),
        );
        assert_eq!(transport.mode(), TransportMode::Websocket);
        assert_eq!(transport.options(), Some(&options));
    }
}
