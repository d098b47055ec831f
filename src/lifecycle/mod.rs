//! Agent lifecycle and the application-facing facade.
//!
//! - [`Agent`] - builds, publishes, and tears down the collaborator services
//! - [`facade`] - metric, action, notification, and event calls on a running agent
//! - [`setup_tracing`] - installs the log subscriber used by the demo binary

pub mod agent;
pub mod error;
pub mod facade;
pub mod tracing;

pub use agent::*;
pub use error::*;
pub use self::tracing::setup_tracing;
