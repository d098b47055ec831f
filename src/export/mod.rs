//! # Span Export Pipeline
//!
//! ```text
//! host tracer ──on_end_span──▶ SpanBuffer ──publish(batch)──▶ SpanExporter ──send("trace-span")──▶ Transport
//! ```
//!
//! - [`span`]: the records the host tracer hands over.
//! - [`SpanBuffer`]: batches root spans by size or interval.
//! - [`SpanExporter`]: flattens, translates, filters, and ships each span.
//! - [`translate`]: the wire record and its conversion rules.

pub mod buffer;
pub mod error;
pub mod exporter;
pub mod span;
pub mod translate;

pub use buffer::{BufferConfig, SpanBuffer, SpanListener};
pub use error::ExportError;
pub use exporter::{ExporterConfig, SpanExporter, TRACE_SPAN_EVENT};
pub use span::*;
pub use translate::{translate_span, TranslatedSpan, WireKind};

/// Sink for flushed batches of root spans.
pub trait SpanPublisher: Send + Sync {
    fn publish(&self, roots: Vec<RootSpan>) -> Result<(), ExportError>;
}
