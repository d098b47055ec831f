//! # Collaborator Contracts
//!
//! The agent core does not compute metrics, run actions, or inspect the runtime
//! itself. Those subsystems are supplied by the host through the traits in this
//! module, and built on demand by a [`ServiceFactory`].
//!
//! Every service shares the [`Service`] lifecycle (`init`/`destroy`). Methods take
//! `&self` because services are shared as `Arc` handles between the agent and the
//! [`ServiceRegistry`](crate::registry::ServiceRegistry); implementations use
//! interior mutability for their own state.

pub mod error;

pub use error::*;

use crate::config::{ApmOptions, RuntimeConfig};
use crate::metrics::{MetricHandle, MetricOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Lifecycle shared by every collaborator service.
pub trait Service: Send + Sync {
    fn init(&self) -> Result<(), ServiceError>;

    /// Releases resources. Must tolerate being called more than once.
    fn destroy(&self);
}

/// Channel used to ship events out of the process.
pub trait Transport: Send + Sync {
    /// Hands `payload` to the transport under `event`. Must not block on I/O.
    fn send(&self, event: &str, payload: Value) -> Result<(), TransportError>;

    fn destroy(&self);
}

/// How the transport reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Local IPC to a sibling process.
    Ipc,
    /// Direct network socket to the remote backend (standalone mode).
    Websocket,
}

impl TransportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Ipc => "ipc",
            TransportMode::Websocket => "websocket",
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remotely triggerable action registered by application code.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn call(&self, params: Option<Value>) -> Value;
}

pub trait ActionService: Service {
    fn register_action(
        &self,
        name: &str,
        options: Option<Value>,
        handler: Arc<dyn ActionHandler>,
    ) -> Result<(), ServiceError>;
}

/// Creates metrics. Gauges are created through [`MetricService::metric`].
pub trait MetricService: Service {
    fn histogram(&self, options: &MetricOptions) -> MetricHandle;
    fn metric(&self, options: &MetricOptions) -> MetricHandle;
    fn counter(&self, options: &MetricOptions) -> MetricHandle;
    fn meter(&self, options: &MetricOptions) -> MetricHandle;
}

pub trait RuntimeStatsService: Service {
    /// Whether the host runtime can report stats. Disabled services are not published.
    fn is_enabled(&self) -> bool;
}

pub trait Notifier: Send + Sync {
    fn notify_error(&self, error: &(dyn std::error::Error + Send + Sync), context: Option<Value>);
}

pub trait EventEmitter: Send + Sync {
    fn emit(&self, name: &str, data: Value);
}

/// Opaque tracer handle owned by the tracing feature.
pub trait TracingFeature: Send + Sync {
    fn is_enabled(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureName {
    Notify,
    Events,
    Tracing,
}

impl FeatureName {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureName::Notify => "notify",
            FeatureName::Events => "events",
            FeatureName::Tracing => "tracing",
        }
    }
}

/// A sub-feature looked up on demand through the [`FeatureManager`].
#[derive(Clone)]
pub enum Feature {
    Notify(Arc<dyn Notifier>),
    Events(Arc<dyn EventEmitter>),
    Tracing(Arc<dyn TracingFeature>),
}

pub trait FeatureManager: Send + Sync {
    fn init(&self, config: &RuntimeConfig) -> Result<(), ServiceError>;
    fn destroy(&self);
    fn get(&self, name: FeatureName) -> Option<Feature>;
}

/// Builds the collaborator services for one `init` cycle.
///
/// The agent calls these in a fixed order; see
/// [`Agent::init`](crate::lifecycle::Agent::init).
pub trait ServiceFactory: Send + Sync {
    fn transport(
        &self,
        mode: TransportMode,
        apm_options: Option<&ApmOptions>,
    ) -> Result<Arc<dyn Transport>, ServiceError>;

    /// `None` when the host runtime has no introspection capability.
    fn inspector(&self) -> Option<Result<Arc<dyn Service>, ServiceError>>;

    fn actions(&self) -> Result<Arc<dyn ActionService>, ServiceError>;

    fn metrics(&self) -> Result<Arc<dyn MetricService>, ServiceError>;

    fn runtime_stats(&self) -> Result<Arc<dyn RuntimeStatsService>, ServiceError>;

    /// Called once when the agent is created.
    fn feature_manager(&self) -> Arc<dyn FeatureManager>;
}
