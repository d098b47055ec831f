//! # Application Facade
//!
//! The calls application code makes on an [`Agent`]: metric creation, action
//! registration, error notification, custom events, and tracer access.
//!
//! None of these fail loudly. Before `init`, or when a collaborator is missing,
//! they log a `trace!` diagnostic and return a sentinel (`None`, `false`, or
//! [`MetricSlot::Unavailable`]). Malformed metric descriptors are logged at
//! `error!` and yield [`MetricSlot::Placeholder`] without affecting the rest of
//! the batch.

use super::Agent;
use crate::metrics::{Measurement, MetricHandle, MetricOptions, MetricSlot, MetricSpec, MetricType};
use crate::registry::keys;
use crate::services::{
    ActionHandler, ActionService, Feature, FeatureName, MetricService, TracingFeature,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, trace, warn};

impl Agent {
    fn metric_service(&self) -> Option<Arc<dyn MetricService>> {
        let service = self
            .registry()
            .lookup::<Arc<dyn MetricService>>(keys::METRICS);
        if service.is_none() {
            trace!("Metric service not available");
        }
        service
    }

    /// Creates one metric per descriptor. The result has the same length and
    /// order as the input.
    pub fn metrics<I>(&self, specs: I) -> Vec<MetricSlot>
    where
        I: IntoIterator,
        I::Item: Into<MetricSpec>,
    {
        let specs: Vec<MetricSpec> = specs.into_iter().map(Into::into).collect();
        if specs.is_empty() {
            error!("No metric descriptors given");
            return Vec::new();
        }

        let service = self.metric_service();
        specs
            .into_iter()
            .map(|spec| {
                let name = spec.name().unwrap_or_default().to_string();
                (name, spec.normalize())
            })
            .map(|(name, normalized)| match normalized {
                Err(e) => {
                    error!(metric = %name, error = %e, "Skipping metric");
                    MetricSlot::Placeholder
                }
                Ok((kind, mut options)) => match &service {
                    None => MetricSlot::Unavailable,
                    Some(service) => {
                        let handle = match kind {
                            MetricType::Counter => service.counter(&options),
                            MetricType::Gauge | MetricType::Metric => service.metric(&options),
                            MetricType::Histogram => {
                                options.measurement.get_or_insert(Measurement::Mean);
                                service.histogram(&options)
                            }
                            MetricType::Meter => service.meter(&options),
                        };
                        MetricSlot::Created(handle)
                    }
                },
            })
            .collect()
    }

    fn create_metric(
        &self,
        spec: MetricSpec,
        create: impl FnOnce(&dyn MetricService, &mut MetricOptions) -> MetricHandle,
    ) -> Option<MetricHandle> {
        let service = self.metric_service()?;
        let name = spec.name().unwrap_or_default().to_string();
        match spec.into_options() {
            Ok(mut options) => Some(create(service.as_ref(), &mut options)),
            Err(e) => {
                error!(metric = %name, error = %e, "Skipping metric");
                None
            }
        }
    }

    /// Histogram reporting the mean unless the descriptor says otherwise.
    pub fn histogram(&self, spec: impl Into<MetricSpec>) -> Option<MetricHandle> {
        self.create_metric(spec.into(), |service, options| {
            options.measurement.get_or_insert(Measurement::Mean);
            service.histogram(options)
        })
    }

    pub fn metric(&self, spec: impl Into<MetricSpec>) -> Option<MetricHandle> {
        self.create_metric(spec.into(), |service, options| service.metric(options))
    }

    /// Same as [`Agent::metric`].
    pub fn gauge(&self, spec: impl Into<MetricSpec>) -> Option<MetricHandle> {
        self.metric(spec)
    }

    pub fn counter(&self, spec: impl Into<MetricSpec>) -> Option<MetricHandle> {
        self.create_metric(spec.into(), |service, options| service.counter(options))
    }

    pub fn meter(&self, spec: impl Into<MetricSpec>) -> Option<MetricHandle> {
        self.create_metric(spec.into(), |service, options| service.meter(options))
    }

    /// Registers a remotely triggerable action. Returns `false` when the action
    /// service is missing or refused the registration.
    pub fn action(
        &self,
        name: &str,
        options: Option<Value>,
        handler: Arc<dyn ActionHandler>,
    ) -> bool {
        let Some(actions) = self
            .registry()
            .lookup::<Arc<dyn ActionService>>(keys::ACTIONS)
        else {
            trace!(action = name, "Action service not available");
            return false;
        };
        match actions.register_action(name, options, handler) {
            Ok(()) => true,
            Err(e) => {
                warn!(action = name, error = %e, "Action registration failed");
                false
            }
        }
    }

    fn feature(&self, name: FeatureName) -> Option<Feature> {
        if !self.is_initialized() {
            trace!(feature = name.as_str(), "Agent not initialized");
            return None;
        }
        let feature = self.feature_manager().get(name);
        if feature.is_none() {
            trace!(feature = name.as_str(), "Feature not available");
        }
        feature
    }

    /// Reports an error to the backend. Returns `false` when notification is unavailable.
    pub fn notify_error(
        &self,
        error: &(dyn std::error::Error + Send + Sync),
        context: Option<Value>,
    ) -> bool {
        match self.feature(FeatureName::Notify) {
            Some(Feature::Notify(notifier)) => {
                notifier.notify_error(error, context);
                true
            }
            _ => false,
        }
    }

    /// Sends a custom event. Returns `false` when events are unavailable.
    pub fn emit(&self, name: &str, data: Value) -> bool {
        match self.feature(FeatureName::Events) {
            Some(Feature::Events(emitter)) => {
                emitter.emit(name, data);
                true
            }
            _ => false,
        }
    }

    pub fn tracer(&self) -> Option<Arc<dyn TracingFeature>> {
        match self.feature(FeatureName::Tracing)? {
            Feature::Tracing(tracer) => Some(tracer),
            _ => None,
        }
    }
}
