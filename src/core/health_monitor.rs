use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use tokio::task::JoinSet;

use crate::{
    config::ServerConfig,
    core::{
        backend::{BackendRecord, BackendResult, BackendSnapshot, BackendUrl, LifecycleStatus},
        probe::HealthProbe,
    },
    metrics,
    ports::http_client::HttpClient,
};

/// Aggregate result of a health check cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSummary {
    pub healthy: usize,
    pub total: usize,
}

/// Owns the backend pool and every write to its health state.
///
/// Pool membership and order are fixed at construction. Callers only ever
/// receive owned snapshots, never the live records' state.
pub struct HealthMonitor {
    backends: Vec<Arc<BackendRecord>>,
    probe: HealthProbe,
}

impl HealthMonitor {
    pub fn new(backends: Vec<BackendRecord>, probe: HealthProbe) -> Self {
        Self {
            backends: backends.into_iter().map(Arc::new).collect(),
            probe,
        }
    }

    /// Build the pool in configuration order
    pub fn from_config(config: &ServerConfig, http_client: Arc<dyn HttpClient>) -> BackendResult<Self> {
        let backends = config
            .resolved_backends()
            .into_iter()
            .map(|backend| Ok(BackendRecord::new(BackendUrl::new(&backend.address)?, backend.id)))
            .collect::<BackendResult<Vec<_>>>()?;

        let probe = HealthProbe::new(
            http_client,
            config.health_check.path.clone(),
            std::time::Duration::from_secs(config.health_check.timeout_secs),
        );

        Ok(Self::new(backends, probe))
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<Arc<BackendRecord>> {
        self.backends.iter().find(|b| b.id() == id).cloned()
    }

    /// Every backend, in pool order
    pub fn get_all(&self) -> Vec<BackendSnapshot> {
        self.backends.iter().map(|b| b.snapshot()).collect()
    }

    /// Backends currently flagged healthy, in pool order. May be empty.
    pub fn get_healthy(&self) -> Vec<BackendSnapshot> {
        self.backends
            .iter()
            .map(|b| b.snapshot())
            .filter(BackendSnapshot::is_healthy)
            .collect()
    }

    pub fn summary(&self) -> HealthSummary {
        HealthSummary {
            healthy: self.backends.iter().filter(|b| b.is_healthy()).count(),
            total: self.backends.len(),
        }
    }

    /// Probe a single backend and apply the result
    pub async fn probe_one(&self, backend: &BackendRecord) -> bool {
        probe_and_update(&self.probe, backend).await
    }

    /// Probe every backend concurrently and wait for all of them.
    ///
    /// A probe task that panics marks its backend unhealthy and the cycle carries on.
    pub async fn run_cycle(&self) -> HealthSummary {
        let mut probes = JoinSet::new();
        let mut pending = HashMap::with_capacity(self.backends.len());

        for backend in &self.backends {
            let probe = self.probe.clone();
            let task_backend = backend.clone();
            let handle = probes.spawn(async move { probe_and_update(&probe, &task_backend).await });
            pending.insert(handle.id(), backend.clone());
        }

        while let Some(joined) = probes.join_next_with_id().await {
            match joined {
                Ok((id, _)) => {
                    pending.remove(&id);
                }
                Err(err) => {
                    if let Some(backend) = pending.remove(&err.id()) {
                        tracing::error!(
                            backend = %backend.id(),
                            "Health probe task failed: {}",
                            err
                        );
                        backend.update_health(false);
                    }
                }
            }
        }

        let summary = self.summary();
        metrics::set_healthy_backends(summary.healthy);
        summary
    }

    /// Force a backend's health flag without probing. Returns `false` for unknown ids.
    pub fn force_health(&self, id: &str, is_healthy: bool) -> bool {
        match self.find(id) {
            Some(backend) => {
                tracing::warn!(backend = %id, healthy = is_healthy, "Backend health forced");
                backend.update_health(is_healthy);
                true
            }
            None => false,
        }
    }

    /// Used when health checking is disabled: every backend is routable
    pub fn mark_all_healthy(&self) {
        for backend in &self.backends {
            backend.update_health(true);
        }
        metrics::set_healthy_backends(self.backends.len());
    }

    /// Flag every backend as stopping for status displays
    pub fn mark_stopping(&self) {
        for backend in &self.backends {
            backend.set_lifecycle(LifecycleStatus::Stopping);
        }
    }
}

async fn probe_and_update(probe: &HealthProbe, backend: &BackendRecord) -> bool {
    let outcome = probe.check(backend).await;
    backend.update_health(outcome.healthy);

    if outcome.healthy {
        tracing::info!(
            "Health check {} ({}): HEALTHY ({})",
            backend.id(),
            backend.address(),
            outcome.reason
        );
    } else {
        tracing::warn!(
            "Health check {} ({}): FAILED ({})",
            backend.id(),
            backend.address(),
            outcome.reason
        );
    }

    outcome.healthy
}
