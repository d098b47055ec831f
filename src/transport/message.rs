use serde_json::Value;
use tokio::sync::oneshot;

/// Messages handled by the transport worker loop.
#[derive(Debug)]
pub enum TransportRequest {
    Send {
        event: String,
        payload: Value,
    },
    /// Answered once every event enqueued before it has been delivered.
    Flush {
        respond_to: oneshot::Sender<()>,
    },
}
