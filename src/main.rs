//! # Agent Core Demo
//!
//! Boots an [`Agent`] on the mock collaborators, creates a few metrics, pushes
//! one traced request through the span pipeline, and shuts down.
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```

use agent_core::config::RuntimeConfig;
use agent_core::export::{
    BufferConfig, CanonicalCode, ExporterConfig, RootSpan, Span, SpanBuffer, SpanExporter,
    SpanKind, SpanListener, SpanStatus,
};
use agent_core::lifecycle::{setup_tracing, Agent};
use agent_core::metrics::{MetricDescriptor, MetricSlot, MetricSpec, MetricType};
use agent_core::mock::MockServiceFactory;
use agent_core::transport::LoggingSink;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    info!("Starting agent demo");

    let factory = Arc::new(MockServiceFactory::new().with_sink(Arc::new(LoggingSink)));
    let mut agent = Agent::new(factory.clone());

    let mut config = RuntimeConfig::from_env();
    config.tracing.enabled = true;
    agent.init(Some(config)).map_err(|e| e.to_string())?;

    let span = tracing::info_span!("metrics");
    async {
        let slots = agent.metrics([
            MetricSpec::from("active requests"),
            MetricDescriptor::new("latency")
                .with_type(MetricType::Histogram)
                .with_unit("ms")
                .into(),
            MetricDescriptor::new("errors")
                .with_type(MetricType::Counter)
                .into(),
        ]);
        let created = slots.iter().filter_map(MetricSlot::handle).count();
        info!(created, requested = slots.len(), "Metrics registered");
    }
    .instrument(span)
    .await;

    let exporter_config = agent
        .config()
        .map(|config| ExporterConfig::from_runtime(config, "checkout"))
        .unwrap_or_else(|| ExporterConfig::new("checkout").with_outbound(false));
    let exporter = SpanExporter::new(exporter_config, agent.registry().clone());
    let buffer = SpanBuffer::new(
        BufferConfig::new(10).with_flush_interval(Duration::from_secs(5)),
        Arc::new(exporter),
    );

    let start = SystemTime::now();
    buffer.on_end_span(
        RootSpan::new(
            Span::new("4bf92f3577b34da6", "00f067aa0ba902b7", "GET /cart")
                .with_kind(SpanKind::Server)
                .with_timing(start, 12.5)
                .with_attribute("http.status_code", 200i64),
        )
        .with_child(
            Span::new("4bf92f3577b34da6", "53995c3f42cd8ad8", "SELECT cart")
                .with_parent("00f067aa0ba902b7")
                .with_kind(SpanKind::Client)
                .with_timing(start, 3.2)
                .with_status(SpanStatus::new(CanonicalCode::Ok)),
        ),
    );
    buffer.flush();

    if let Some(transport) = factory.last_transport() {
        transport.flush().await.map_err(|e| e.to_string())?;
        info!(sent = transport.sent().len(), "Spans exported");
    }

    agent.destroy();
    info!("Agent demo finished");

    Ok(())
}
