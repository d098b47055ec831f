//! Error types for metric descriptor normalization.

use thiserror::Error;

/// Why a metric descriptor could not be turned into a metric.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetricError {
    /// The descriptor carries no name.
    #[error("Trying to create a metric without a name")]
    MissingName,

    /// The `type` field is not one of the known metric types.
    #[error("Invalid metric type {kind} for metric {name}")]
    UnknownType { kind: String, name: String },
}
