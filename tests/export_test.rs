use agent_core::config::RuntimeConfig;
use agent_core::export::{
    BufferConfig, CanonicalCode, ExportError, ExporterConfig, RootSpan, Span, SpanBuffer,
    SpanExporter, SpanKind, SpanListener, SpanPublisher, SpanStatus, TRACE_SPAN_EVENT,
};
use agent_core::lifecycle::Agent;
use agent_core::mock::MockServiceFactory;
use agent_core::services::TransportError;
use agent_core::transport::EventSink;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

fn started_agent() -> (Arc<MockServiceFactory>, Agent) {
    let factory = Arc::new(MockServiceFactory::new());
    let mut agent = Agent::new(factory.clone());
    agent.init(Some(RuntimeConfig::default())).unwrap();
    (factory, agent)
}

fn checkout_batch() -> RootSpan {
    let start = UNIX_EPOCH + Duration::from_millis(1_700_000_000_000);
    RootSpan::new(
        Span::new("trace-1", "A", "POST /checkout")
            .with_kind(SpanKind::Server)
            .with_timing(start, 12.5)
            .with_attribute("http.method", "POST"),
    )
    .with_child(
        Span::new("trace-1", "B", "GET /inventory")
            .with_parent("A")
            .with_kind(SpanKind::Client)
            .with_timing(start, 4.0)
            .with_status(SpanStatus::new(CanonicalCode::NotFound).with_message("no stock")),
    )
}

/// A server root with one client child produces two trace-span events in order.
#[test]
fn test_checkout_batch_is_exported_in_order() {
    let (factory, agent) = started_agent();
    let exporter = SpanExporter::new(
        ExporterConfig::new("checkout").with_outbound(false),
        agent.registry().clone(),
    );

    exporter.publish(vec![checkout_batch()]).unwrap();

    let payloads = factory.last_transport().unwrap().payloads(TRACE_SPAN_EVENT);
    assert_eq!(payloads.len(), 2);

    let root = &payloads[0];
    assert_eq!(root["id"], "A");
    assert_eq!(root["kind"], "SERVER");
    assert_eq!(root["timestamp"], 1_700_000_000_000_000u64);
    assert_eq!(root["duration"], 12_500);
    assert_eq!(root["tags"]["result.code"], "OK");
    assert_eq!(root["localEndpoint"]["serviceName"], "checkout");
    assert!(root.get("parentId").is_none());

    let child = &payloads[1];
    assert_eq!(child["id"], "B");
    assert_eq!(child["parentId"], "A");
    assert_eq!(child["kind"], "CLIENT");
    assert_eq!(child["tags"]["result.code"], "NOT_FOUND");
    assert_eq!(child["tags"]["result.message"], "no stock");
}

#[test]
fn test_outbound_root_client_filtered() {
    let (factory, agent) = started_agent();
    let outgoing = RootSpan::new(Span::new("trace-2", "C", "GET /rates").with_kind(SpanKind::Client));

    let filtered = SpanExporter::new(
        ExporterConfig::new("checkout").with_outbound(false),
        agent.registry().clone(),
    );
    filtered.publish(vec![outgoing.clone()]).unwrap();
    assert!(factory.last_transport().unwrap().sent().is_empty());

    let unfiltered = SpanExporter::new(ExporterConfig::new("checkout"), agent.registry().clone());
    unfiltered.publish(vec![outgoing]).unwrap();
    assert_eq!(factory.last_transport().unwrap().sent().len(), 1);
}

#[test]
fn test_publish_without_transport_returns_error() {
    let factory = Arc::new(MockServiceFactory::new());
    let agent = Agent::new(factory);
    let exporter = SpanExporter::new(ExporterConfig::new("checkout"), agent.registry().clone());

    let result = exporter.publish(vec![checkout_batch()]);
    assert!(matches!(result, Err(ExportError::TransportUnavailable)));
}

#[test]
fn test_exporter_follows_reinit() {
    let (factory, mut agent) = started_agent();
    let exporter = SpanExporter::new(ExporterConfig::new("checkout"), agent.registry().clone());
    let first = factory.last_transport().unwrap();

    agent.init(Some(RuntimeConfig::default())).unwrap();
    exporter.publish(vec![checkout_batch()]).unwrap();

    assert!(first.sent().is_empty());
    assert_eq!(factory.last_transport().unwrap().sent().len(), 2);
}

#[test]
fn test_exporter_after_destroy_reports_missing_transport() {
    let (_factory, mut agent) = started_agent();
    let exporter = SpanExporter::new(ExporterConfig::new("checkout"), agent.registry().clone());
    agent.destroy();

    let result = exporter.publish(vec![checkout_batch()]);
    assert!(matches!(result, Err(ExportError::TransportUnavailable)));
}

#[test]
fn test_buffer_feeds_exporter() {
    let (factory, agent) = started_agent();
    let exporter = SpanExporter::new(ExporterConfig::new("checkout"), agent.registry().clone());
    let buffer = SpanBuffer::new(BufferConfig::new(2), Arc::new(exporter));

    buffer.on_end_span(checkout_batch());
    assert!(factory.last_transport().unwrap().sent().is_empty());

    buffer.on_end_span(RootSpan::new(Span::new("trace-3", "D", "GET /health")));

    let ids: Vec<Value> = factory
        .last_transport()
        .unwrap()
        .payloads(TRACE_SPAN_EVENT)
        .into_iter()
        .map(|payload| payload["id"].clone())
        .collect();
    assert_eq!(ids, vec!["A", "B", "D"]);
}

#[derive(Default)]
struct Collect {
    delivered: Mutex<Vec<Value>>,
}

#[async_trait]
impl EventSink for Collect {
    async fn deliver(&self, _event: &str, payload: Value) -> Result<(), TransportError> {
        self.delivered.lock().unwrap().push(payload);
        Ok(())
    }
}

/// Spans travel through the queued transport to the sink.
#[tokio::test]
async fn test_spans_reach_sink_through_queued_transport() {
    let sink = Arc::new(Collect::default());
    let factory = Arc::new(MockServiceFactory::new().with_sink(sink.clone()));
    let mut agent = Agent::new(factory.clone());
    agent.init(Some(RuntimeConfig::default())).unwrap();

    let exporter = SpanExporter::new(ExporterConfig::new("checkout"), agent.registry().clone());
    exporter.publish(vec![checkout_batch()]).unwrap();
    factory.last_transport().unwrap().flush().await.unwrap();

    assert_eq!(sink.delivered.lock().unwrap().len(), 2);
    agent.destroy();
}
