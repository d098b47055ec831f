use agent_core::config::RuntimeConfig;
use agent_core::lifecycle::Agent;
use agent_core::metrics::{
    Measurement, MetricDescriptor, MetricOptions, MetricSlot, MetricSpec, MetricType,
};
use agent_core::mock::{MockMetric, MockServiceFactory};
use agent_core::services::{ActionHandler, TracingFeature};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

fn started_agent() -> (Arc<MockServiceFactory>, Agent) {
    let factory = Arc::new(MockServiceFactory::new());
    let mut agent = Agent::new(factory.clone());
    agent.init(Some(RuntimeConfig::default())).unwrap();
    (factory, agent)
}

fn descriptor(name: &str, kind: &str) -> MetricSpec {
    let mut descriptor = MetricDescriptor::new(name);
    descriptor.kind = Some(kind.to_string());
    descriptor.into()
}

/// A malformed descriptor in the middle of a batch does not affect its neighbours.
#[test]
fn test_metrics_batch_keeps_length_and_order() {
    let (factory, agent) = started_agent();

    let slots = agent.metrics(vec![
        MetricSpec::from("a"),
        descriptor("b", "bogus"),
        descriptor("c", "counter"),
    ]);

    assert_eq!(slots.len(), 3);
    assert!(slots[0].is_created());
    assert!(matches!(slots[1], MetricSlot::Placeholder));
    assert!(slots[2].is_created());

    let created = factory.metric_service().unwrap().created();
    assert_eq!(
        created,
        vec![
            MockMetric {
                kind: MetricType::Gauge,
                options: MetricOptions::new("a"),
            },
            MockMetric {
                kind: MetricType::Counter,
                options: MetricOptions::new("c"),
            },
        ]
    );
}

#[test]
fn test_slot_handle_exposes_created_metric() {
    let (_factory, agent) = started_agent();

    let slots = agent.metrics(vec![descriptor("hits", "meter"), descriptor("x", "bogus")]);

    let metric = slots[0]
        .handle()
        .and_then(|handle| handle.downcast_ref::<MockMetric>())
        .unwrap();
    assert_eq!(metric.kind, MetricType::Meter);
    assert_eq!(metric.options.name, "hits");
    assert!(slots[1].handle().is_none());
}

#[test]
fn test_metric_type_routing() {
    let (factory, agent) = started_agent();

    agent.metrics(vec![
        descriptor("g", "gauge"),
        descriptor("m", "metric"),
        descriptor("h", "histogram"),
        descriptor("r", "meter"),
    ]);

    let kinds: Vec<MetricType> = factory
        .metric_service()
        .unwrap()
        .created()
        .into_iter()
        .map(|metric| metric.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            MetricType::Gauge,
            MetricType::Gauge,
            MetricType::Histogram,
            MetricType::Meter
        ]
    );
}

#[test]
fn test_missing_name_becomes_placeholder() {
    let (_factory, agent) = started_agent();
    let nameless: MetricSpec = MetricDescriptor {
        name: None,
        ..MetricDescriptor::new("ignored")
    }
    .into();

    let slots = agent.metrics(vec![nameless]);
    assert!(matches!(slots.as_slice(), [MetricSlot::Placeholder]));
}

#[test]
fn test_empty_batch_returns_empty() {
    let (factory, agent) = started_agent();
    let slots = agent.metrics(Vec::<MetricSpec>::new());
    assert!(slots.is_empty());
    assert!(factory.metric_service().unwrap().created().is_empty());
}

#[test]
fn test_metrics_before_init_are_unavailable() {
    let factory = Arc::new(MockServiceFactory::new());
    let agent = Agent::new(factory);

    let slots = agent.metrics(["a", "b"]);
    assert!(slots.iter().all(|slot| matches!(slot, MetricSlot::Unavailable)));
    assert!(agent.counter("requests").is_none());
    assert!(agent.histogram("latency").is_none());
}

#[test]
fn test_histogram_defaults_to_mean() {
    let (factory, agent) = started_agent();

    assert!(agent.histogram("latency").is_some());
    assert!(agent
        .histogram(MetricDescriptor::new("p95").with_measurement(Measurement::P95))
        .is_some());

    let created = factory.metric_service().unwrap().created();
    assert_eq!(created[0].options.measurement, Some(Measurement::Mean));
    assert_eq!(created[1].options.measurement, Some(Measurement::P95));
}

#[test]
fn test_kind_constructors_return_handles() {
    let (factory, agent) = started_agent();

    let handle = agent.counter("errors").unwrap();
    let metric = handle.downcast_ref::<MockMetric>().unwrap();
    assert_eq!(metric.kind, MetricType::Counter);

    assert!(agent.gauge("queue depth").is_some());
    assert!(agent.metric("cache size").is_some());
    assert!(agent.meter("req/s").is_some());
    assert_eq!(factory.metric_service().unwrap().created().len(), 4);
}

#[test]
fn test_metrics_unavailable_after_destroy() {
    let (_factory, mut agent) = started_agent();
    agent.destroy();
    assert!(agent.meter("req/s").is_none());
}

struct Echo;

#[async_trait]
impl ActionHandler for Echo {
    async fn call(&self, params: Option<Value>) -> Value {
        json!({ "echo": params })
    }
}

#[tokio::test]
async fn test_action_registration_and_trigger() {
    let (factory, agent) = started_agent();

    assert!(agent.action("echo", None, Arc::new(Echo)));
    assert!(!agent.action("", None, Arc::new(Echo)));

    let actions = factory.action_service().unwrap();
    assert_eq!(actions.names(), vec!["echo"]);
    let reply = actions.trigger("echo", Some(json!(1))).await.unwrap();
    assert_eq!(reply, json!({ "echo": 1 }));
}

#[test]
fn test_action_before_init_is_rejected() {
    let factory = Arc::new(MockServiceFactory::new());
    let agent = Agent::new(factory);
    assert!(!agent.action("echo", None, Arc::new(Echo)));
}

#[derive(Debug, thiserror::Error)]
#[error("payment declined")]
struct Declined;

#[test]
fn test_features_forwarded_after_init() {
    let factory = Arc::new(MockServiceFactory::new());
    let mut agent = Agent::new(factory.clone());

    assert!(!agent.emit("deploy", json!({})));
    assert!(!agent.notify_error(&Declined, None));
    assert!(agent.tracer().is_none());

    let mut config = RuntimeConfig::default();
    config.tracing.enabled = true;
    agent.init(Some(config)).unwrap();

    assert!(agent.emit("deploy", json!({ "version": "1.2.0" })));
    assert!(agent.notify_error(&Declined, Some(json!({ "order": 42 }))));
    assert!(agent.tracer().unwrap().is_enabled());

    let features = factory.features().unwrap();
    assert_eq!(
        features.emitter.emitted(),
        vec![("deploy".to_string(), json!({ "version": "1.2.0" }))]
    );
    assert_eq!(
        features.notifier.notified(),
        vec![("payment declined".to_string(), Some(json!({ "order": 42 })))]
    );

    agent.destroy();
    assert!(!agent.emit("deploy", json!({})));
}
