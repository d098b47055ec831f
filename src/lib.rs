//! # Agent Core
//!
//! > **The embedded core of an application performance monitoring agent.**
//!
//! The crate boots and tears down the agent's collaborator services in a fixed
//! order, publishes them in a shared registry, exposes a tolerant facade for
//! application code (metrics, actions, error notification, custom events), and
//! ships finished trace spans to the backend as individual `trace-span` events.
//!
//! ## 🏗️ Design
//!
//! ### Collaborators behind traits
//! The agent never computes metrics or talks to the network itself. Transport,
//! introspection, actions, metrics, runtime stats, and sub-features are supplied
//! through the traits in [`services`] and built by a
//! [`ServiceFactory`](services::ServiceFactory) on every `init`.
//!
//! ### One registry, passed by handle
//! Services are published under well-known names in a
//! [`ServiceRegistry`](registry::ServiceRegistry). The registry is a cloneable
//! handle injected into whoever needs it; the span exporter, for instance,
//! resolves the transport from it at send time.
//!
//! ### Failures stay local
//! Facade calls never panic. Misuse before `init` is logged at `trace` and
//! answered with a sentinel, malformed metric descriptors become placeholders,
//! and export failures are returned as values and logged by the span buffer.
//! Startup is the one fail-fast path, and it rolls back completely.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Orchestrator ([`lifecycle`])
//! - **Role**: builds, publishes, and destroys the collaborators; hosts the facade.
//! - **Key items**: [`Agent`](lifecycle::Agent), [`init`](lifecycle::Agent::init),
//!   [`destroy`](lifecycle::Agent::destroy), [`metrics`](lifecycle::Agent::metrics).
//!
//! ### 2. The Directory ([`registry`])
//! - **Role**: name → shared instance lookup with typed downcasts.
//!
//! ### 3. The Contracts ([`services`], [`config`], [`metrics`])
//! - **Role**: collaborator traits, runtime configuration, and metric descriptors.
//!
//! ### 4. The Pipeline ([`export`], [`transport`])
//! - **Role**: batch, translate, filter, and ship spans without blocking producers.
//! - **Key items**: [`SpanBuffer`](export::SpanBuffer), [`SpanExporter`](export::SpanExporter),
//!   [`QueuedTransport`](transport::QueuedTransport).
//!
//! ### 5. Testing ([`mock`])
//! Journaling implementations of every collaborator with failure injection.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with lifecycle logs
//! RUST_LOG=info cargo run
//!
//! # Run the tests
//! cargo test
//! ```

pub mod config;
pub mod export;
pub mod lifecycle;
pub mod metrics;
pub mod mock;
pub mod registry;
pub mod services;
pub mod transport;
