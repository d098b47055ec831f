//! Delivery targets for [`QueuedTransport`](super::QueuedTransport).

use crate::services::TransportError;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Performs the actual I/O for one event.
#[async_trait]
pub trait EventSink: Send + Sync + 'static {
    async fn deliver(&self, event: &str, payload: Value) -> Result<(), TransportError>;
}

/// Writes every event to the log. Used by the demo binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

#[async_trait]
impl EventSink for LoggingSink {
    async fn deliver(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        info!(event, %payload, "Delivered");
        Ok(())
    }
}
