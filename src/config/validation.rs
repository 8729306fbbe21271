//! Configuration validation.
//!
//! Serde handles the syntactic checks; this module checks value ranges and
//! cross-field requirements. Validation is a pure function
//! `AppConfig → Result<(), Vec<ValidationError>>` and reports every
//! problem, not just the first.

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::schema::AppConfig;

/// A single semantic problem in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.app.name.trim().is_empty() {
        errors.push(ValidationError::new("app.name", "must not be empty"));
    }

    let server = &config.server;
    if server.host.trim().is_empty() {
        errors.push(ValidationError::new("server.host", "must not be empty"));
    }
    if server.max_connections == 0 {
        errors.push(ValidationError::new("server.max_connections", "must be greater than 0"));
    }
    if server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than 0"));
    }
    if server.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::new("server.shutdown_timeout_secs", "must be greater than 0"));
    }

    if let Err(e) = EnvFilter::try_new(&config.log.level) {
        errors.push(ValidationError::new("log.level", format!("invalid filter: {e}")));
    }

    let cloud = &config.cloud;
    // The health route can be mounted without registering.
    if !cloud.health_check_path.starts_with('/') {
        errors.push(ValidationError::new("cloud.health_check_path", "must start with '/'"));
    }
    if cloud.enabled {
        if let Err(e) = url::Url::parse(&cloud.consul_address) {
            errors.push(ValidationError::new("cloud.consul_address", format!("invalid URL: {e}")));
        }
        if cloud.health_check_interval_secs == 0 {
            errors.push(ValidationError::new(
                "cloud.health_check_interval_secs",
                "must be greater than 0",
            ));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn health_path_is_checked_with_discovery_disabled() {
        let mut config = AppConfig::default();
        config.cloud.enabled = false;
        config.cloud.health_check_path = "health".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "cloud.health_check_path");
    }

    #[test]
    fn reports_every_error() {
        let mut config = AppConfig::default();
        config.app.name = "  ".into();
        config.server.max_connections = 0;
        config.server.shutdown_timeout_secs = 0;
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "app.name",
                "server.max_connections",
                "server.shutdown_timeout_secs",
                "observability.metrics_address",
            ]
        );
    }

    #[test]
    fn cloud_checked_only_when_enabled() {
        let mut config = AppConfig::default();
        config.cloud.consul_address = "not a url".into();
        assert!(validate_config(&config).is_ok());

        config.cloud.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "cloud.consul_address");
    }
}
