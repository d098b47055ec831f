//! Errors returned by span publishing.

use crate::services::TransportError;

/// Failure while issuing span sends. Returned as a value from
/// [`SpanPublisher::publish`](super::SpanPublisher::publish), never raised.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No transport registered")]
    TransportUnavailable,
    #[error("Failed to encode span {span_id}: {source}")]
    Encode {
        span_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to send span {span_id}: {source}")]
    Send {
        span_id: String,
        #[source]
        source: TransportError,
    },
}
