//! # Service Errors
//!
//! Errors reported by collaborator services back to the agent.

/// Failure while constructing or initializing a collaborator service.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ServiceError {
    #[error("Service construction failed: {0}")]
    Construction(String),
    #[error("Service init failed: {0}")]
    Init(String),
    #[error("Action registration failed: {0}")]
    Action(String),
}

/// Failure while handing an event to a transport.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum TransportError {
    #[error("Transport closed")]
    Closed,
    #[error("Delivery failed: {0}")]
    Delivery(String),
}
