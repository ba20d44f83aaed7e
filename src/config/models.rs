//! Configuration data structures for Roundhouse.
//!
//! These types map directly to YAML (also JSON / TOML) configuration files. They are
//! serde‑friendly and include defaults so that minimal configs remain concise.
//! The builder here is considered part of the public API for embedding.
use serde::{Deserialize, Serialize};

/// A single backend in the pool.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Stable identifier; must match the `serverId` reported by the backend's health endpoint
    pub id: String,
    /// Base URL requests are forwarded to, e.g. `http://localhost:8001`
    pub address: String,
}

impl BackendConfig {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub path: String,
    /// Delay before the first cycle; zero brings a fresh pool to a known state quickly
    pub initial_delay_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 5,
            path: "/health".to_string(),
            initial_delay_ms: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Upper bound on distinct backends tried per request
    pub max_attempts: usize,
    /// Per-attempt timeout covering connect, response headers and body
    pub timeout_secs: u64,
    /// Largest inbound body buffered for replay across attempts
    pub max_body_bytes: usize,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout_secs: 10,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Administrative listener used by test and chaos tooling.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,
    pub listen_addr: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1:9100".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
    /// Shorthand for local backends: each port becomes `server-N` at `http://localhost:{port}`
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub health_check: HealthCheckConfig,
    #[serde(default)]
    pub forwarding: ForwardingConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Create a new server configuration builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// The full backend pool in configuration order: explicit `backends` first,
    /// then one entry per `ports` shorthand, numbered after the explicit ones.
    pub fn resolved_backends(&self) -> Vec<BackendConfig> {
        let mut pool = self.backends.clone();
        let offset = pool.len();
        pool.extend(self.ports.iter().enumerate().map(|(index, port)| {
            BackendConfig::new(
                format!("server-{}", offset + index + 1),
                format!("http://localhost:{port}"),
            )
        }));
        pool
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:9000".to_string(),
            backends: Vec::new(),
            ports: Vec::new(),
            health_check: HealthCheckConfig::default(),
            forwarding: ForwardingConfig::default(),
            admin: AdminConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Builder for ServerConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct ServerConfigBuilder {
    listen_addr: Option<String>,
    backends: Vec<BackendConfig>,
    ports: Vec<u16>,
    health_check: Option<HealthCheckConfig>,
    forwarding: Option<ForwardingConfig>,
    admin: Option<AdminConfig>,
    logging: Option<LoggingConfig>,
}

impl ServerConfigBuilder {
    /// Set the listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = Some(addr.into());
        self
    }

    /// Append a backend to the pool
    pub fn backend(mut self, id: impl Into<String>, address: impl Into<String>) -> Self {
        self.backends.push(BackendConfig::new(id, address));
        self
    }

    /// Append localhost backends by port
    pub fn ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.ports.extend(ports);
        self
    }

    /// Set health check configuration
    pub fn health_check(mut self, config: HealthCheckConfig) -> Self {
        self.health_check = Some(config);
        self
    }

    /// Set forwarding configuration
    pub fn forwarding(mut self, config: ForwardingConfig) -> Self {
        self.forwarding = Some(config);
        self
    }

    /// Set admin listener configuration
    pub fn admin(mut self, config: AdminConfig) -> Self {
        self.admin = Some(config);
        self
    }

    /// Set logging configuration
    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Build the final ServerConfig
    pub fn build(self) -> Result<ServerConfig, String> {
        let listen_addr = self
            .listen_addr
            .ok_or_else(|| "listen_addr is required".to_string())?;

        Ok(ServerConfig {
            listen_addr,
            backends: self.backends,
            ports: self.ports,
            health_check: self.health_check.unwrap_or_default(),
            forwarding: self.forwarding.unwrap_or_default(),
            admin: self.admin.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_shorthand_numbering() {
        let config = ServerConfig::builder()
            .listen_addr("127.0.0.1:9000")
            .ports([8001, 8002, 8003])
            .build()
            .unwrap();

        let pool = config.resolved_backends();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool[0], BackendConfig::new("server-1", "http://localhost:8001"));
        assert_eq!(pool[1], BackendConfig::new("server-2", "http://localhost:8002"));
        assert_eq!(pool[2], BackendConfig::new("server-3", "http://localhost:8003"));
    }

    #[test]
    fn test_explicit_backends_precede_ports() {
        let config = ServerConfig::builder()
            .listen_addr("127.0.0.1:9000")
            .backend("api-a", "http://10.0.0.5:8080")
            .ports([8001])
            .build()
            .unwrap();

        let pool = config.resolved_backends();
        assert_eq!(pool[0].id, "api-a");
        assert_eq!(pool[1].id, "server-2");
    }

    #[test]
    fn test_builder_requires_listen_addr() {
        assert!(ServerConfig::builder().ports([8001]).build().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.forwarding.max_attempts, 3);
        assert_eq!(config.health_check.path, "/health");
        assert_eq!(config.health_check.initial_delay_ms, 0);
        assert!(!config.admin.enabled);
        assert_eq!(config.logging.format, LogFormat::Json);
    }
}
