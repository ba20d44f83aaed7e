use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::ServerConfig;

/// Prefix for environment overrides, e.g. `ROUNDHOUSE__HEALTH_CHECK__INTERVAL_SECS=5`
pub const ENV_PREFIX: &str = "ROUNDHOUSE";

/// Load configuration from a file using the config crate
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<ServerConfig> {
    load_config_sync(config_path)
}

/// Load configuration synchronously
pub fn load_config_sync(config_path: &str) -> Result<ServerConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        _ => FileFormat::Yaml, // Default to YAML
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let server_config: ServerConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(server_config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::config::models::LogFormat;

    #[tokio::test]
    async fn test_load_yaml_config() {
        let yaml_content = r#"
listen_addr: "127.0.0.1:9000"
health_check:
  interval_secs: 30
backends:
  - id: "server-1"
    address: "http://localhost:8001"
  - id: "server-2"
    address: "http://localhost:8002"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.backends.len(), 2);
        assert_eq!(config.backends[1].address, "http://localhost:8002");
        assert_eq!(config.health_check.interval_secs, 30);
        // Unspecified fields keep their defaults
        assert_eq!(config.health_check.path, "/health");
        assert_eq!(config.forwarding.max_attempts, 3);
    }

    #[tokio::test]
    async fn test_load_json_config() {
        let json_content = r#"
{
  "listen_addr": "127.0.0.1:9000",
  "ports": [8001, 8002, 8003],
  "forwarding": {
    "max_attempts": 2
  },
  "logging": {
    "level": "debug",
    "format": "pretty"
  }
}
"#;

        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        write!(temp_file, "{}", json_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(config.resolved_backends().len(), 3);
        assert_eq!(config.forwarding.max_attempts, 2);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[tokio::test]
    async fn test_load_toml_config() {
        let toml_content = r#"
listen_addr = "0.0.0.0:9000"

[admin]
enabled = true
listen_addr = "127.0.0.1:9200"

[[backends]]
id = "edge-a"
address = "https://edge-a.internal"
"#;

        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(temp_file, "{}", toml_content).unwrap();

        let config = load_config(temp_file.path().to_str().unwrap())
            .await
            .unwrap();
        assert!(config.admin.enabled);
        assert_eq!(config.admin.listen_addr, "127.0.0.1:9200");
        assert_eq!(config.backends[0].id, "edge-a");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        assert!(load_config("/nonexistent/roundhouse.yaml").await.is_err());
    }
}
