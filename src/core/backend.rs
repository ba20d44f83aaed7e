use std::{fmt, str::FromStr, sync::Arc};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::set_backend_health_status;

/// Errors related to backend operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BackendError {
    /// Error when URL is invalid
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// A type-safe representation of a backend base URL.
///
/// Trailing slashes are trimmed so the address can be joined directly with an
/// inbound `path_and_query`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BackendUrl {
    url: String,
}

impl BackendUrl {
    /// Creates a new BackendUrl if the provided string is an absolute http(s) URL with a host
    pub fn new(url: &str) -> BackendResult<Self> {
        let parsed = url::Url::parse(url)
            .map_err(|e| BackendError::InvalidUrl(format!("{url}: {e}")))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(BackendError::InvalidUrl(format!(
                "Backend URL must start with http:// or https://, got: {url}"
            )));
        }

        if parsed.host_str().is_none() {
            return Err(BackendError::InvalidUrl(format!(
                "Backend URL must have a host, got: {url}"
            )));
        }

        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(BackendError::InvalidUrl(format!(
                "Backend URL must not carry a query or fragment, got: {url}"
            )));
        }

        // Store the normalized (percent-encoded) form so joined targets always parse as a URI
        Ok(BackendUrl {
            url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Get the underlying URL as a string reference
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Join with an origin-form request target (`/path?query`)
    pub fn join(&self, path_and_query: &str) -> String {
        if path_and_query.starts_with('/') {
            format!("{}{}", self.url, path_and_query)
        } else {
            format!("{}/{}", self.url, path_and_query)
        }
    }
}

impl FromStr for BackendUrl {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendUrl::new(s)
    }
}

impl fmt::Display for BackendUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Routing-relevant health flag. Only `Healthy` admits a backend to the healthy set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No probe has completed yet
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Unknown => write!(f, "unknown"),
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Coarse lifecycle label for status displays. Never consulted for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    #[default]
    Unknown,
    Starting,
    Healthy,
    Unhealthy,
    Stopping,
    Error,
}

/// One consistent view of a backend's mutable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct HealthState {
    pub health: HealthStatus,
    /// `None` until the first probe completes
    pub last_check: Option<DateTime<Utc>>,
    pub lifecycle: LifecycleStatus,
}

impl HealthState {
    pub fn is_healthy(&self) -> bool {
        self.health == HealthStatus::Healthy
    }
}

/// Identity plus live health state for one backend in the pool.
///
/// Identity is immutable. The health state is swapped as a whole on every
/// update, so readers never observe a flag from one probe paired with the
/// timestamp of another.
#[derive(Debug)]
pub struct BackendRecord {
    id: String,
    address: BackendUrl,
    state: ArcSwap<HealthState>,
}

impl BackendRecord {
    /// Creates a record in the `unknown` state with no completed probe
    pub fn new(address: BackendUrl, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address,
            state: ArcSwap::from_pointee(HealthState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn address(&self) -> &BackendUrl {
        &self.address
    }

    /// Current state (cheap `Arc` clone)
    pub fn state(&self) -> Arc<HealthState> {
        self.state.load_full()
    }

    pub fn is_healthy(&self) -> bool {
        self.state.load().is_healthy()
    }

    /// Record a completed probe: sets the flag, stamps `last_check` and derives the lifecycle label
    pub fn update_health(&self, is_healthy: bool) {
        let (health, lifecycle) = if is_healthy {
            (HealthStatus::Healthy, LifecycleStatus::Healthy)
        } else {
            (HealthStatus::Unhealthy, LifecycleStatus::Unhealthy)
        };

        self.state.store(Arc::new(HealthState {
            health,
            last_check: Some(Utc::now()),
            lifecycle,
        }));
        set_backend_health_status(&self.id, is_healthy);
    }

    /// Change only the display lifecycle, keeping health and timestamp
    pub fn set_lifecycle(&self, lifecycle: LifecycleStatus) {
        self.state.rcu(|current| HealthState {
            lifecycle,
            ..(**current).clone()
        });
    }

    /// Owned copy for read-only consumers
    pub fn snapshot(&self) -> BackendSnapshot {
        BackendSnapshot {
            id: self.id.clone(),
            address: self.address.clone(),
            state: (*self.state()).clone(),
        }
    }
}

/// Immutable copy of a backend record taken at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendSnapshot {
    pub id: String,
    pub address: BackendUrl,
    #[serde(flatten)]
    pub state: HealthState,
}

impl BackendSnapshot {
    pub fn is_healthy(&self) -> bool {
        self.state.is_healthy()
    }
}
