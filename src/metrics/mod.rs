//! Metric descriptors, normalization, and the result slots returned by the
//! metric facade on [`Agent`](crate::lifecycle::Agent).

pub mod descriptor;
pub mod error;

pub use descriptor::*;
pub use error::*;

use std::any::Any;
use std::sync::Arc;

/// Opaque metric object returned by the metric service.
pub type MetricHandle = Arc<dyn Any + Send + Sync>;

/// One entry of a [`Agent::metrics`](crate::lifecycle::Agent::metrics) batch.
#[derive(Clone)]
pub enum MetricSlot {
    Created(MetricHandle),
    /// The descriptor was malformed (no name or unknown type).
    Placeholder,
    /// The metric service is not available.
    Unavailable,
}

impl MetricSlot {
    pub fn is_created(&self) -> bool {
        matches!(self, MetricSlot::Created(_))
    }

    pub fn handle(&self) -> Option<&MetricHandle> {
        match self {
            MetricSlot::Created(handle) => Some(handle),
            _ => None,
        }
    }
}

impl std::fmt::Debug for MetricSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricSlot::Created(_) => f.write_str("Created(..)"),
            MetricSlot::Placeholder => f.write_str("Placeholder"),
            MetricSlot::Unavailable => f.write_str("Unavailable"),
        }
    }
}
