use super::error::AgentError;
use crate::config::RuntimeConfig;
use crate::registry::{keys, ServiceRegistry};
use crate::services::{
    ActionService, FeatureManager, MetricService, RuntimeStatsService, Service, ServiceError,
    ServiceFactory, Transport, TransportMode,
};
use std::sync::Arc;
use tracing::{debug, error, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Initialized,
}

/// The agent entry point. Owns the collaborator services for one `init` cycle
/// and publishes them in the [`ServiceRegistry`].
///
/// # Example
///
/// ```ignore
/// let mut agent = Agent::new(factory);
/// agent.init(None)?;
///
/// let slots = agent.metrics(["requests", "latency"]);
///
/// agent.destroy();
/// ```
pub struct Agent {
    factory: Arc<dyn ServiceFactory>,
    registry: ServiceRegistry,
    feature_manager: Arc<dyn FeatureManager>,
    state: LifecycleState,
    services: Option<Services>,
    config: Option<RuntimeConfig>,
}

impl Agent {
    /// Creates an uninitialized agent with its own registry.
    pub fn new(factory: Arc<dyn ServiceFactory>) -> Self {
        Self::with_registry(factory, ServiceRegistry::new())
    }

    /// Creates an uninitialized agent publishing into `registry`.
    pub fn with_registry(factory: Arc<dyn ServiceFactory>, registry: ServiceRegistry) -> Self {
        let feature_manager = factory.feature_manager();
        Self {
            factory,
            registry,
            feature_manager,
            state: LifecycleState::Uninitialized,
            services: None,
            config: None,
        }
    }

    /// Starts every collaborator and publishes it.
    ///
    /// Without a config, one is derived from the environment
    /// ([`RuntimeConfig::from_env`]). Calling `init` on an initialized agent
    /// destroys the previous cycle first.
    ///
    /// Startup is all-or-nothing: on failure every service built by this call
    /// is destroyed, its registry entries are removed, and the agent stays
    /// uninitialized.
    pub fn init(&mut self, config: Option<RuntimeConfig>) -> Result<&mut Self, AgentError> {
        if self.is_initialized() {
            info!("Re-initializing agent");
            self.destroy();
        }

        let config = config.unwrap_or_else(RuntimeConfig::from_env);
        let mut services = Services::default();

        if let Err(e) = self.start(&config, &mut services) {
            error!(stage = e.stage(), error = %e, "Startup failed, rolling back");
            services.teardown(&self.registry);
            return Err(e);
        }

        info!(
            standalone = config.standalone,
            published = ?services.published,
            "Agent initialized"
        );
        self.services = Some(services);
        self.config = Some(config);
        self.state = LifecycleState::Initialized;
        Ok(self)
    }

    fn start(&self, config: &RuntimeConfig, services: &mut Services) -> Result<(), AgentError> {
        let mode = if config.standalone {
            TransportMode::Websocket
        } else {
            TransportMode::Ipc
        };
        let transport = self
            .factory
            .transport(mode, config.apm_options.as_ref())
            .map_err(at_stage(keys::TRANSPORT))?;
        services.transport = Some(transport.clone());
        services.publish(&self.registry, keys::TRANSPORT, transport);
        debug!(%mode, "Transport ready");

        if let Some(inspector) = self.factory.inspector() {
            let inspector = inspector.map_err(at_stage(keys::INSPECTOR))?;
            services.inspector = Some(inspector.clone());
            inspector.init().map_err(at_stage(keys::INSPECTOR))?;
            services.publish(&self.registry, keys::INSPECTOR, inspector);
        } else {
            trace!("No introspection service available");
        }

        let actions = self.factory.actions().map_err(at_stage(keys::ACTIONS))?;
        services.actions = Some(actions.clone());
        actions.init().map_err(at_stage(keys::ACTIONS))?;
        services.publish(&self.registry, keys::ACTIONS, actions);

        let metrics = self.factory.metrics().map_err(at_stage(keys::METRICS))?;
        services.metrics = Some(metrics.clone());
        metrics.init().map_err(at_stage(keys::METRICS))?;
        services.publish(&self.registry, keys::METRICS, metrics);

        let runtime_stats = self
            .factory
            .runtime_stats()
            .map_err(at_stage(keys::RUNTIME_STATS))?;
        services.runtime_stats = Some(runtime_stats.clone());
        runtime_stats.init().map_err(at_stage(keys::RUNTIME_STATS))?;
        if runtime_stats.is_enabled() {
            services.publish(&self.registry, keys::RUNTIME_STATS, runtime_stats);
        } else {
            debug!("Runtime stats disabled, not published");
        }

        self.feature_manager
            .init(config)
            .map_err(at_stage("featureManager"))?;

        Ok(())
    }

    /// Stops every collaborator started by the last successful `init`.
    ///
    /// The feature manager goes first, then actions, transport, metrics and
    /// runtime stats, and finally the introspection service found in the
    /// registry. Does nothing when the agent is not initialized.
    pub fn destroy(&mut self) {
        let Some(mut services) = self.services.take() else {
            trace!("Destroy on uninitialized agent ignored");
            return;
        };
        self.feature_manager.destroy();
        services.teardown(&self.registry);
        self.state = LifecycleState::Uninitialized;
        info!("Agent destroyed");
    }

    /// Config persisted by the last successful `init`.
    pub fn config(&self) -> Option<&RuntimeConfig> {
        self.config.as_ref()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state == LifecycleState::Initialized
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub(crate) fn feature_manager(&self) -> &Arc<dyn FeatureManager> {
        &self.feature_manager
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn at_stage(stage: &'static str) -> impl FnOnce(ServiceError) -> AgentError {
    move |source| AgentError::Startup { stage, source }
}

/// Services built by one `init` attempt and the registry keys it published.
#[derive(Default)]
struct Services {
    transport: Option<Arc<dyn Transport>>,
    inspector: Option<Arc<dyn Service>>,
    actions: Option<Arc<dyn ActionService>>,
    metrics: Option<Arc<dyn MetricService>>,
    runtime_stats: Option<Arc<dyn RuntimeStatsService>>,
    published: Vec<&'static str>,
}

impl Services {
    fn publish<T: std::any::Any + Send + Sync>(
        &mut self,
        registry: &ServiceRegistry,
        key: &'static str,
        instance: T,
    ) {
        registry.register(key, instance);
        self.published.push(key);
        info!(service = key, "Registered");
    }

    fn teardown(&mut self, registry: &ServiceRegistry) {
        if let Some(actions) = self.actions.take() {
            actions.destroy();
        }
        if let Some(transport) = self.transport.take() {
            transport.destroy();
        }
        if let Some(metrics) = self.metrics.take() {
            metrics.destroy();
        }
        if let Some(runtime_stats) = self.runtime_stats.take() {
            runtime_stats.destroy();
        }
        let published_inspector = if self.published.contains(&keys::INSPECTOR) {
            registry.lookup::<Arc<dyn Service>>(keys::INSPECTOR)
        } else {
            None
        };
        let inspector = published_inspector.or_else(|| self.inspector.take());
        if let Some(inspector) = inspector {
            inspector.destroy();
        }

        for key in self.published.drain(..) {
            registry.remove(key);
        }
    }
}
