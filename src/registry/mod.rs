//! # Service Registry
//!
//! A keyed store of service handles shared between the [`Agent`](crate::lifecycle::Agent)
//! and the collaborators it wires together (e.g. the span exporter looks up the
//! transport here at flush time).
//!
//! The registry does not own service lifecycles. It only remembers the latest
//! handle registered under each name.
//!
//! ## Typed lookup
//!
//! Entries are stored as `Arc<dyn Any>`. Callers pick the type they expect when
//! looking up, usually a trait object handle such as `Arc<dyn Transport>`:
//!
//! ```rust
//! use agent_core::registry::ServiceRegistry;
//! use std::sync::Arc;
//!
//! let registry = ServiceRegistry::new();
//! registry.register("answer", Arc::new(42u32));
//! assert_eq!(registry.lookup::<Arc<u32>>("answer").as_deref(), Some(&42));
//! assert!(registry.lookup::<Arc<u32>>("missing").is_none());
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Well-known registry keys published by the agent.
pub mod keys {
    pub const TRANSPORT: &str = "transport";
    pub const INSPECTOR: &str = "inspector";
    pub const ACTIONS: &str = "actions";
    pub const METRICS: &str = "metrics";
    pub const RUNTIME_STATS: &str = "runtimeStats";
}

type Entry = Arc<dyn Any + Send + Sync>;

/// Cloneable handle over a shared `name -> service` map.
///
/// Clones share the same underlying map, so a registry handed to the exporter
/// sees every later `register` done by the agent.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `instance` under `name`, replacing any previous entry.
    pub fn register<T>(&self, name: impl Into<String>, instance: T)
    where
        T: Any + Send + Sync,
    {
        let name = name.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let replaced = entries.insert(name.clone(), Arc::new(instance)).is_some();
        debug!(service = %name, replaced, "Registered");
    }

    /// Returns a clone of the entry under `name` if it exists and holds a `T`.
    pub fn lookup<T>(&self, name: &str) -> Option<T>
    where
        T: Any + Clone,
    {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(name)?.downcast_ref::<T>().cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(name)
    }

    /// Forgets the entry under `name`. Returns whether one was present.
    pub fn remove(&self, name: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(name).is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("names", &self.names())
            .finish()
    }
}
