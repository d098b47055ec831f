//! # Mock Collaborators
//!
//! Recording implementations of every collaborator trait, for testing code that
//! drives an [`Agent`](crate::lifecycle::Agent) without a real host runtime.
//!
//! Every mock writes to a shared [`Journal`] (`"metrics:init"`,
//! `"transport:destroy"`, ...), so tests can assert on the exact order of
//! lifecycle calls. Failures are injected per stage with
//! [`MockServiceFactory::fail_construct`] and [`MockServiceFactory::fail_init`].
//!
//! ```ignore
//! let factory = Arc::new(MockServiceFactory::new().fail_init("metrics"));
//! let journal = factory.journal();
//! let mut agent = Agent::new(factory.clone());
//!
//! assert!(agent.init(Some(RuntimeConfig::default())).is_err());
//! journal.verify_order(&["actions:init", "metrics:init", "actions:destroy"]);
//! journal.verify_destroyed_once("transport");
//! ```

use crate::config::{ApmOptions, RuntimeConfig};
use crate::metrics::{MetricHandle, MetricOptions, MetricType};
use crate::registry::keys;
use crate::services::{
    ActionHandler, ActionService, EventEmitter, Feature, FeatureManager, FeatureName,
    MetricService, Notifier, RuntimeStatsService, Service, ServiceError, ServiceFactory,
    TracingFeature, Transport, TransportError, TransportMode,
};
use crate::transport::{EventSink, QueuedTransport};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Stage name used for the feature manager in journals and failure injection.
pub const FEATURE_MANAGER: &str = "featureManager";

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// JOURNAL
// =============================================================================

/// Ordered record of lifecycle calls shared by all mocks of one factory.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        lock(&self.entries).push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    pub fn count(&self, entry: &str) -> usize {
        lock(&self.entries).iter().filter(|e| *e == entry).count()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.count(entry) > 0
    }

    /// Asserts that `expected` appears in the journal in this relative order.
    pub fn verify_order(&self, expected: &[&str]) {
        let entries = self.entries();
        let mut remaining = entries.iter();
        for wanted in expected {
            assert!(
                remaining.any(|e| e == wanted),
                "journal entry {:?} missing or out of order in {:?}",
                wanted,
                entries
            );
        }
    }

    /// Asserts that the service named `name` was destroyed exactly once.
    pub fn verify_destroyed_once(&self, name: &str) {
        let entry = format!("{}:destroy", name);
        let count = self.count(&entry);
        assert_eq!(count, 1, "{} recorded {} times in {:?}", entry, count, self.entries());
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries()).finish()
    }
}

// =============================================================================
// SERVICES
// =============================================================================

/// Plain [`Service`] that journals its lifecycle.
pub struct MockService {
    name: &'static str,
    journal: Journal,
    fail_init: bool,
}

impl MockService {
    fn new(name: &'static str, journal: Journal, fail_init: bool) -> Self {
        journal.record(format!("{}:construct", name));
        Self {
            name,
            journal,
            fail_init,
        }
    }
}

impl Service for MockService {
    fn init(&self) -> Result<(), ServiceError> {
        self.journal.record(format!("{}:init", self.name));
        if self.fail_init {
            return Err(ServiceError::Init(format!("{} refused to start", self.name)));
        }
        Ok(())
    }

    fn destroy(&self) {
        self.journal.record(format!("{}:destroy", self.name));
    }
}

/// Transport that records every send and optionally forwards to a
/// [`QueuedTransport`].
pub struct MockTransport {
    mode: TransportMode,
    options: Option<ApmOptions>,
    journal: Journal,
    sent: Mutex<Vec<(String, Value)>>,
    closed: AtomicBool,
    forward: Option<QueuedTransport>,
}

impl MockTransport {
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn options(&self) -> Option<&ApmOptions> {
        self.options.as_ref()
    }

    pub fn sent(&self) -> Vec<(String, Value)> {
        lock(&self.sent).clone()
    }

    /// Payloads sent under `event`, in order.
    pub fn payloads(&self, event: &str) -> Vec<Value> {
        lock(&self.sent)
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Waits for the forwarding transport, if any, to deliver everything sent so far.
    pub async fn flush(&self) -> Result<(), TransportError> {
        match &self.forward {
            Some(forward) => forward.flush().await,
            None => Ok(()),
        }
    }
}

impl Transport for MockTransport {
    fn send(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if let Some(forward) = &self.forward {
            forward.send(event, payload.clone())?;
        }
        lock(&self.sent).push((event.to_string(), payload));
        Ok(())
    }

    fn destroy(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(forward) = &self.forward {
            forward.destroy();
        }
        self.journal.record(format!("{}:destroy", keys::TRANSPORT));
    }
}

pub struct MockActionService {
    base: MockService,
    handlers: Mutex<HashMap<String, Arc<dyn ActionHandler>>>,
}

impl MockActionService {
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.handlers).keys().cloned().collect();
        names.sort();
        names
    }

    /// Invokes a registered action as the backend would.
    pub async fn trigger(&self, name: &str, params: Option<Value>) -> Option<Value> {
        let handler = lock(&self.handlers).get(name).cloned()?;
        Some(handler.call(params).await)
    }
}

impl Service for MockActionService {
    fn init(&self) -> Result<(), ServiceError> {
        self.base.init()
    }

    fn destroy(&self) {
        self.base.destroy()
    }
}

impl ActionService for MockActionService {
    fn register_action(
        &self,
        name: &str,
        _options: Option<Value>,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<(), ServiceError> {
        if name.is_empty() {
            return Err(ServiceError::Action("action name is empty".into()));
        }
        lock(&self.handlers).insert(name.to_string(), handler);
        Ok(())
    }
}

/// Handle returned by [`MockMetricService`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockMetric {
    pub kind: MetricType,
    pub options: MetricOptions,
}

pub struct MockMetricService {
    base: MockService,
    created: Mutex<Vec<MockMetric>>,
}

impl MockMetricService {
    pub fn created(&self) -> Vec<MockMetric> {
        lock(&self.created).clone()
    }

    fn create(&self, kind: MetricType, options: &MetricOptions) -> MetricHandle {
        let metric = MockMetric {
            kind,
            options: options.clone(),
        };
        lock(&self.created).push(metric.clone());
        Arc::new(metric)
    }
}

impl Service for MockMetricService {
    fn init(&self) -> Result<(), ServiceError> {
        self.base.init()
    }

    fn destroy(&self) {
        self.base.destroy()
    }
}

impl MetricService for MockMetricService {
    fn histogram(&self, options: &MetricOptions) -> MetricHandle {
        self.create(MetricType::Histogram, options)
    }

    fn metric(&self, options: &MetricOptions) -> MetricHandle {
        self.create(MetricType::Gauge, options)
    }

    fn counter(&self, options: &MetricOptions) -> MetricHandle {
        self.create(MetricType::Counter, options)
    }

    fn meter(&self, options: &MetricOptions) -> MetricHandle {
        self.create(MetricType::Meter, options)
    }
}

pub struct MockRuntimeStats {
    base: MockService,
    enabled: bool,
}

impl Service for MockRuntimeStats {
    fn init(&self) -> Result<(), ServiceError> {
        self.base.init()
    }

    fn destroy(&self) {
        self.base.destroy()
    }
}

impl RuntimeStatsService for MockRuntimeStats {
    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// =============================================================================
// FEATURES
// =============================================================================

#[derive(Default)]
pub struct MockNotifier {
    notified: Mutex<Vec<(String, Option<Value>)>>,
}

impl MockNotifier {
    pub fn notified(&self) -> Vec<(String, Option<Value>)> {
        lock(&self.notified).clone()
    }
}

impl Notifier for MockNotifier {
    fn notify_error(&self, error: &(dyn std::error::Error + Send + Sync), context: Option<Value>) {
        lock(&self.notified).push((error.to_string(), context));
    }
}

#[derive(Default)]
pub struct MockEmitter {
    emitted: Mutex<Vec<(String, Value)>>,
}

impl MockEmitter {
    pub fn emitted(&self) -> Vec<(String, Value)> {
        lock(&self.emitted).clone()
    }
}

impl EventEmitter for MockEmitter {
    fn emit(&self, name: &str, data: Value) {
        lock(&self.emitted).push((name.to_string(), data));
    }
}

#[derive(Default)]
pub struct MockTracer {
    enabled: AtomicBool,
}

impl TracingFeature for MockTracer {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

/// Feature manager exposing all three features once initialized.
pub struct MockFeatureManager {
    journal: Journal,
    fail_init: bool,
    initialized: AtomicBool,
    pub notifier: Arc<MockNotifier>,
    pub emitter: Arc<MockEmitter>,
    pub tracer: Arc<MockTracer>,
}

impl FeatureManager for MockFeatureManager {
    fn init(&self, config: &RuntimeConfig) -> Result<(), ServiceError> {
        self.journal.record(format!("{}:init", FEATURE_MANAGER));
        if self.fail_init {
            return Err(ServiceError::Init("feature manager refused to start".into()));
        }
        self.tracer
            .enabled
            .store(config.tracing.enabled, Ordering::SeqCst);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn destroy(&self) {
        self.initialized.store(false, Ordering::SeqCst);
        self.journal.record(format!("{}:destroy", FEATURE_MANAGER));
    }

    fn get(&self, name: FeatureName) -> Option<Feature> {
        if !self.initialized.load(Ordering::SeqCst) {
            return None;
        }
        Some(match name {
            FeatureName::Notify => Feature::Notify(self.notifier.clone()),
            FeatureName::Events => Feature::Events(self.emitter.clone()),
            FeatureName::Tracing => Feature::Tracing(self.tracer.clone()),
        })
    }
}

// =============================================================================
// FACTORY
// =============================================================================

/// Builds journaling mocks. Keeps the most recent instance of each service so
/// tests can inspect it.
pub struct MockServiceFactory {
    journal: Journal,
    inspector: bool,
    runtime_stats_enabled: bool,
    fail_construct: HashSet<&'static str>,
    fail_init: HashSet<&'static str>,
    sink: Option<Arc<dyn EventSink>>,
    feature_manager: Mutex<Option<Arc<MockFeatureManager>>>,
    last_transport: Mutex<Option<Arc<MockTransport>>>,
    last_actions: Mutex<Option<Arc<MockActionService>>>,
    last_metrics: Mutex<Option<Arc<MockMetricService>>>,
}

impl Default for MockServiceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServiceFactory {
    pub fn new() -> Self {
        Self {
            journal: Journal::default(),
            inspector: true,
            runtime_stats_enabled: true,
            fail_construct: HashSet::new(),
            fail_init: HashSet::new(),
            sink: None,
            feature_manager: Mutex::new(None),
            last_transport: Mutex::new(None),
            last_actions: Mutex::new(None),
            last_metrics: Mutex::new(None),
        }
    }

    /// Simulates a host runtime without an introspection capability.
    pub fn without_inspector(mut self) -> Self {
        self.inspector = false;
        self
    }

    pub fn with_runtime_stats_disabled(mut self) -> Self {
        self.runtime_stats_enabled = false;
        self
    }

    /// Transports built by this factory forward every send to a
    /// [`QueuedTransport`] delivering into `sink`. Requires a tokio runtime.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Makes construction of `stage` (a registry key) fail.
    pub fn fail_construct(mut self, stage: &'static str) -> Self {
        self.fail_construct.insert(stage);
        self
    }

    /// Makes `init` of `stage` (a registry key or [`FEATURE_MANAGER`]) fail.
    pub fn fail_init(mut self, stage: &'static str) -> Self {
        self.fail_init.insert(stage);
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn last_transport(&self) -> Option<Arc<MockTransport>> {
        lock(&self.last_transport).clone()
    }

    pub fn action_service(&self) -> Option<Arc<MockActionService>> {
        lock(&self.last_actions).clone()
    }

    pub fn metric_service(&self) -> Option<Arc<MockMetricService>> {
        lock(&self.last_metrics).clone()
    }

    pub fn features(&self) -> Option<Arc<MockFeatureManager>> {
        lock(&self.feature_manager).clone()
    }

    fn construct(&self, stage: &'static str) -> Result<MockService, ServiceError> {
        if self.fail_construct.contains(stage) {
            self.journal.record(format!("{}:construct-failed", stage));
            return Err(ServiceError::Construction(format!("{} unavailable", stage)));
        }
        Ok(MockService::new(
            stage,
            self.journal.clone(),
            self.fail_init.contains(stage),
        ))
    }
}

impl ServiceFactory for MockServiceFactory {
    fn transport(
        &self,
        mode: TransportMode,
        apm_options: Option<&ApmOptions>,
    ) -> Result<Arc<dyn Transport>, ServiceError> {
        if self.fail_construct.contains(keys::TRANSPORT) {
            self.journal
                .record(format!("{}:construct-failed", keys::TRANSPORT));
            return Err(ServiceError::Construction("transport unavailable".into()));
        }
        self.journal
            .record(format!("{}:construct({})", keys::TRANSPORT, mode));
        let forward = self
            .sink
            .clone()
            .map(|sink| QueuedTransport::spawn(mode, apm_options.cloned(), sink));
        let transport = Arc::new(MockTransport {
            mode,
            options: apm_options.cloned(),
            journal: self.journal.clone(),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            forward,
        });
        *lock(&self.last_transport) = Some(transport.clone());
        Ok(transport)
    }

    fn inspector(&self) -> Option<Result<Arc<dyn Service>, ServiceError>> {
        if !self.inspector {
            return None;
        }
        Some(
            self.construct(keys::INSPECTOR)
                .map(|service| Arc::new(service) as Arc<dyn Service>),
        )
    }

    fn actions(&self) -> Result<Arc<dyn ActionService>, ServiceError> {
        let service = Arc::new(MockActionService {
            base: self.construct(keys::ACTIONS)?,
            handlers: Mutex::new(HashMap::new()),
        });
        *lock(&self.last_actions) = Some(service.clone());
        Ok(service)
    }

    fn metrics(&self) -> Result<Arc<dyn MetricService>, ServiceError> {
        let service = Arc::new(MockMetricService {
            base: self.construct(keys::METRICS)?,
            created: Mutex::new(Vec::new()),
        });
        *lock(&self.last_metrics) = Some(service.clone());
        Ok(service)
    }

    fn runtime_stats(&self) -> Result<Arc<dyn RuntimeStatsService>, ServiceError> {
        Ok(Arc::new(MockRuntimeStats {
            base: self.construct(keys::RUNTIME_STATS)?,
            enabled: self.runtime_stats_enabled,
        }))
    }

    fn feature_manager(&self) -> Arc<dyn FeatureManager> {
        let manager = Arc::new(MockFeatureManager {
            journal: self.journal.clone(),
            fail_init: self.fail_init.contains(FEATURE_MANAGER),
            initialized: AtomicBool::new(false),
            notifier: Arc::new(MockNotifier::default()),
            emitter: Arc::new(MockEmitter::default()),
            tracer: Arc::new(MockTracer::default()),
        });
        *lock(&self.feature_manager) = Some(manager.clone());
        manager
    }
}
