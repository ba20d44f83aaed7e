//! Single health check against one backend and interpretation of its answer.
use std::{sync::Arc, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    core::backend::BackendRecord,
    ports::http_client::{HttpClient, HttpClientError},
};

/// Literal status a backend must report to be considered healthy
pub const HEALTHY_MARKER: &str = "healthy";

/// Why a probe resolved to unhealthy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProbeFailure {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed health payload: {0}")]
    MalformedPayload(String),

    #[error("reported status {0:?}")]
    NotHealthy(String),

    #[error("identity mismatch: expected {expected}, got {actual}")]
    IdentityMismatch { expected: String, actual: String },
}

impl From<HttpClientError> for ProbeFailure {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::Timeout(after) => ProbeFailure::Timeout(after),
            other => ProbeFailure::Transport(other.to_string()),
        }
    }
}

/// Result of one probe: the routing verdict plus a human-readable reason for logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub healthy: bool,
    pub reason: String,
}

impl ProbeOutcome {
    fn healthy() -> Self {
        Self {
            healthy: true,
            reason: "OK".to_string(),
        }
    }

    fn failed(failure: &ProbeFailure) -> Self {
        Self {
            healthy: false,
            reason: failure.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HealthPayload {
    status: String,
    #[serde(rename = "serverId", alias = "server_id", alias = "id")]
    server_id: String,
}

/// Check a health endpoint body against the identity the backend was configured with.
pub fn evaluate_health_payload(body: &[u8], expected_id: &str) -> Result<(), ProbeFailure> {
    let payload: HealthPayload = serde_json::from_slice(body)
        .map_err(|e| ProbeFailure::MalformedPayload(e.to_string()))?;

    if payload.status != HEALTHY_MARKER {
        return Err(ProbeFailure::NotHealthy(payload.status));
    }

    if payload.server_id != expected_id {
        return Err(ProbeFailure::IdentityMismatch {
            expected: expected_id.to_string(),
            actual: payload.server_id,
        });
    }

    Ok(())
}

/// Issues bounded-timeout GETs against a backend's health endpoint.
#[derive(Clone)]
pub struct HealthProbe {
    http_client: Arc<dyn HttpClient>,
    path: String,
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(http_client: Arc<dyn HttpClient>, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client,
            path: path.into(),
            timeout,
        }
    }

    /// Probe one backend. Never fails: every error path resolves to an unhealthy outcome.
    pub async fn check(&self, backend: &BackendRecord) -> ProbeOutcome {
        match self.try_check(backend).await {
            Ok(()) => ProbeOutcome::healthy(),
            Err(failure) => ProbeOutcome::failed(&failure),
        }
    }

    async fn try_check(&self, backend: &BackendRecord) -> Result<(), ProbeFailure> {
        let url = backend.address().join(&self.path);
        tracing::debug!("Health checking: {}", url);

        let response = self.http_client.health_check(&url, self.timeout).await?;

        if !response.status.is_success() {
            return Err(ProbeFailure::Status(response.status.as_u16()));
        }

        evaluate_health_payload(&response.body, backend.id())
    }
}
