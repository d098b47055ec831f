//! # Diagnostics Logging
//!
//! The agent reports its own behavior through the `tracing` crate with
//! structured fields. Nothing is printed unless the host installs a subscriber;
//! [`setup_tracing`] installs the compact formatter used by the demo binary.
//!
//! ## Levels
//!
//! - `info`: lifecycle milestones (`Registered service="metrics"`, `Agent destroyed`).
//! - `warn`: failed deliveries and dropped span batches.
//! - `error`: startup rollbacks and malformed metric descriptors.
//! - `debug`: flushes and transport mode selection.
//! - `trace`: facade calls made while a collaborator is missing.
//!
//! ## Usage
//!
//! ```bash
//! # Lifecycle only
//! RUST_LOG=info cargo run
//!
//! # Include misuse diagnostics
//! RUST_LOG=agent_core=trace cargo run
//! ```
//!
//! With `RUST_LOG=info` a demo run looks like:
//!
//! ```text
//! INFO Registered service="transport"
//! INFO Registered service="actions"
//! INFO Registered service="metrics"
//! INFO Agent initialized standalone=false published=["transport", "actions", "metrics", "runtimeStats"]
//! INFO Delivered event="trace-span" payload={...}
//! INFO Agent destroyed
//! ```

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
