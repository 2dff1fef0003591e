//! Backend registry and fallback selection
//!
//! Holds one shared `GuardedBackend` per enabled backend, the default
//! backend and the ordered fallback chain. The registry snapshot is an
//! immutable map behind an `Arc`; a configuration hot-swap builds a fresh
//! map and replaces it atomically, so no job ever observes a half-updated
//! registry. Guards for unaffected backends are reused, which leaves their
//! circuit breaker state (and any in-flight calls) untouched.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use backend_sdk::{BackendIdentity, GuardedBackend};

use crate::error::{EngineError, Result};

struct Snapshot {
    backends: HashMap<BackendIdentity, Arc<GuardedBackend>>,
    default_backend: BackendIdentity,
    fallback_chain: Vec<BackendIdentity>,
}

/// Registry of enabled backends, shared across all jobs
pub struct BackendRegistry {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl BackendRegistry {
    /// Build a registry from the configured guards
    pub fn new(
        guards: Vec<Arc<GuardedBackend>>,
        default_backend: BackendIdentity,
        fallback_chain: Vec<BackendIdentity>,
    ) -> Self {
        let backends = guards
            .into_iter()
            .map(|guard| (guard.identity(), guard))
            .collect();
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot {
                backends,
                default_backend,
                fallback_chain,
            })),
        }
    }

    fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().unwrap())
    }

    /// Look up one backend's guard
    pub fn get(&self, identity: BackendIdentity) -> Option<Arc<GuardedBackend>> {
        self.current().backends.get(&identity).cloned()
    }

    /// The configured default backend
    pub fn default_backend(&self) -> BackendIdentity {
        self.current().default_backend
    }

    /// Identities of all enabled backends
    pub fn enabled(&self) -> Vec<BackendIdentity> {
        let mut ids: Vec<_> = self.current().backends.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Validate a job's requested backend list and resolve the guards
    ///
    /// Rejected synchronously at submission: an empty list or an entry that
    /// is not configured/enabled never reaches the orchestrator.
    pub fn resolve(&self, requested: &[BackendIdentity]) -> Result<Vec<Arc<GuardedBackend>>> {
        if requested.is_empty() {
            return Err(EngineError::NoBackendsSelected);
        }
        let snapshot = self.current();
        requested
            .iter()
            .map(|identity| {
                snapshot
                    .backends
                    .get(identity)
                    .cloned()
                    .ok_or(EngineError::NoSuchBackend(*identity))
            })
            .collect()
    }

    /// Candidate guards for a single-backend request: the primary first,
    /// then the fallback chain (minus the primary, unknown entries skipped)
    pub fn candidates(&self, primary: BackendIdentity) -> Vec<Arc<GuardedBackend>> {
        let snapshot = self.current();
        let mut chain = Vec::new();
        if let Some(guard) = snapshot.backends.get(&primary) {
            chain.push(Arc::clone(guard));
        }
        for identity in &snapshot.fallback_chain {
            if *identity == primary {
                continue;
            }
            if let Some(guard) = snapshot.backends.get(identity) {
                chain.push(Arc::clone(guard));
            }
        }
        chain
    }

    /// Replace the guards for the given backends, atomically
    ///
    /// Used by administrative configuration updates: affected backends get
    /// fresh guards (and therefore fresh circuit breakers); every other
    /// entry keeps its existing guard instance.
    pub fn reload(&self, replacements: Vec<Arc<GuardedBackend>>) {
        let mut snapshot = self.snapshot.write().unwrap();
        let mut backends = snapshot.backends.clone();
        for guard in replacements {
            info!(backend = %guard.identity(), "Reloading backend guard");
            backends.insert(guard.identity(), guard);
        }
        *snapshot = Arc::new(Snapshot {
            backends,
            default_backend: snapshot.default_backend,
            fallback_chain: snapshot.fallback_chain.clone(),
        });
    }

    /// Replace the whole registry: guard set, default and fallback chain
    pub fn replace_all(
        &self,
        guards: Vec<Arc<GuardedBackend>>,
        default_backend: BackendIdentity,
        fallback_chain: Vec<BackendIdentity>,
    ) {
        let backends = guards
            .into_iter()
            .map(|guard| (guard.identity(), guard))
            .collect();
        *self.snapshot.write().unwrap() = Arc::new(Snapshot {
            backends,
            default_backend,
            fallback_chain,
        });
    }
}
