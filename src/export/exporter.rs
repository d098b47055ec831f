//! # Span Exporter
//!
//! Turns a flushed batch of [`RootSpan`]s into individual `trace-span` events on
//! the registered [`Transport`].
//!
//! The exporter does not keep its own transport handle. It resolves the
//! transport from the [`ServiceRegistry`] on every publish, so it follows the
//! agent through re-initialization.

use super::error::ExportError;
use super::span::RootSpan;
use super::translate::{translate_span, TranslatedSpan};
use super::SpanPublisher;
use crate::config::RuntimeConfig;
use crate::registry::{keys, ServiceRegistry};
use crate::services::Transport;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Event name under which spans are shipped.
pub const TRACE_SPAN_EVENT: &str = "trace-span";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    /// Written to `localEndpoint.serviceName` on every span.
    pub service_name: String,
    /// When false, root client spans (outgoing calls with no parent) are not exported.
    pub outbound: bool,
}

impl ExporterConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            outbound: true,
        }
    }

    /// Takes `outbound` from the runtime's `tracing` section.
    pub fn from_runtime(config: &RuntimeConfig, service_name: impl Into<String>) -> Self {
        Self::new(service_name).with_outbound(config.tracing.outbound)
    }

    pub fn with_outbound(mut self, outbound: bool) -> Self {
        self.outbound = outbound;
        self
    }
}

pub struct SpanExporter {
    config: ExporterConfig,
    registry: ServiceRegistry,
}

impl SpanExporter {
    pub fn new(config: ExporterConfig, registry: ServiceRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &ExporterConfig {
        &self.config
    }

    /// Flattens and translates a batch: each root, then its children.
    pub fn mount_span_list(&self, roots: Vec<RootSpan>) -> Vec<TranslatedSpan> {
        roots
            .into_iter()
            .flat_map(RootSpan::into_spans)
            .map(|span| translate_span(span, &self.config.service_name))
            .collect()
    }

    fn send_traces(&self, spans: Vec<TranslatedSpan>) -> Result<(), ExportError> {
        let transport = self
            .registry
            .lookup::<Arc<dyn Transport>>(keys::TRANSPORT)
            .ok_or(ExportError::TransportUnavailable)?;

        let mut sent = 0usize;
        for span in spans {
            if span.is_root_client() && !self.config.outbound {
                trace!(span_id = %span.id, "Skipping outbound root span");
                continue;
            }
            let span_id = span.id.clone();
            let payload = serde_json::to_value(&span).map_err(|source| ExportError::Encode {
                span_id: span_id.clone(),
                source,
            })?;
            transport
                .send(TRACE_SPAN_EVENT, payload)
                .map_err(|source| ExportError::Send { span_id, source })?;
            sent += 1;
        }
        debug!(sent, "Spans handed to transport");
        Ok(())
    }
}

impl SpanPublisher for SpanExporter {
    fn publish(&self, roots: Vec<RootSpan>) -> Result<(), ExportError> {
        let spans = self.mount_span_list(roots);
        self.send_traces(spans).inspect_err(|e| {
            warn!(error = %e, "Span export failed");
        })
    }
}
