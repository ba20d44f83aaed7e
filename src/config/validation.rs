use std::{collections::HashSet, net::SocketAddr};

use crate::config::models::{BackendConfig, ForwardingConfig, HealthCheckConfig, ServerConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Duplicate backend id '{id}'")]
    DuplicateBackend { id: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Server configuration validator
pub struct ServerConfigValidator;

impl ServerConfigValidator {
    /// Validate the entire server configuration.
    ///
    /// An empty backend pool is accepted: the balancer then answers every
    /// request with 503 until backends are configured.
    pub fn validate(config: &ServerConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if config.admin.enabled {
            if let Err(e) = Self::validate_listen_address(&config.admin.listen_addr) {
                errors.push(e);
            } else if config.admin.listen_addr == config.listen_addr {
                errors.push(ValidationError::InvalidField {
                    field: "admin.listen_addr".to_string(),
                    message: "Must differ from the forwarding listen address".to_string(),
                });
            }
        }

        if let Err(mut backend_errors) = Self::validate_backends(&config.resolved_backends()) {
            errors.append(&mut backend_errors);
        }

        if let Err(mut health_check_errors) =
            Self::validate_health_check_config(&config.health_check)
        {
            errors.append(&mut health_check_errors);
        }

        if let Err(mut forwarding_errors) = Self::validate_forwarding_config(&config.forwarding) {
            errors.append(&mut forwarding_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:9000' or '0.0.0.0:9000')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_backends(backends: &[BackendConfig]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for backend in backends {
            if backend.id.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: format!("backend '{}' id", backend.address),
                    message: "Backend id cannot be empty".to_string(),
                });
            } else if !seen.insert(backend.id.as_str()) {
                errors.push(ValidationError::DuplicateBackend {
                    id: backend.id.clone(),
                });
            }

            if let Err(e) =
                Self::validate_url(&backend.address, &format!("backend '{}' address", backend.id))
            {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate URL format
    fn validate_url(url_str: &str, context: &str) -> ValidationResult<()> {
        match url::Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: format!(
                            "URL scheme must be 'http' or 'https', got '{}'",
                            url.scheme()
                        ),
                    });
                }

                if url.host().is_none() {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: "URL must have a valid host".to_string(),
                    });
                }

                if url.query().is_some() || url.fragment().is_some() {
                    return Err(ValidationError::InvalidField {
                        field: context.to_string(),
                        message: "Backend address must not carry a query or fragment".to_string(),
                    });
                }

                Ok(())
            }
            Err(e) => Err(ValidationError::InvalidField {
                field: context.to_string(),
                message: format!("Invalid URL format: {e}"),
            }),
        }
    }

    fn validate_health_check_config(
        config: &HealthCheckConfig,
    ) -> Result<(), Vec<ValidationError>> {
        if !config.enabled {
            return Ok(());
        }

        let mut errors = Vec::new();

        if config.interval_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "health_check.interval_secs".to_string(),
                message: "Must be greater than 0 when health checks are enabled".to_string(),
            });
        }

        if config.timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "health_check.timeout_secs".to_string(),
                message: "Must be greater than 0 when health checks are enabled".to_string(),
            });
        }

        if config.path.is_empty() || !config.path.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: "health_check.path".to_string(),
                message: format!("Must start with '/', got '{}'", config.path),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_forwarding_config(config: &ForwardingConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if config.max_attempts == 0 {
            errors.push(ValidationError::InvalidField {
                field: "forwarding.max_attempts".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        if config.timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "forwarding.timeout_secs".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Format multiple validation errors into a readable message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.is_empty() {
            return "No errors".to_string();
        }

        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
