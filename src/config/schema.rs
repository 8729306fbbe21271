//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for an
//! application. All types derive Serde traits for deserialization from the
//! config file, and every section has defaults so a minimal file (or no
//! file at all, via `AppConfig::default()`) is enough to boot.

use serde::{Deserialize, Serialize};

/// Root configuration for an application.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Application identity.
    pub app: AppSection,

    /// HTTP listener and drain settings.
    pub server: ServerConfig,

    /// Logging settings.
    pub log: LogConfig,

    /// Service discovery settings.
    pub cloud: CloudConfig,

    /// Metrics exposition settings.
    pub observability: ObservabilityConfig,

    /// Free-form application settings, read by handlers.
    pub settings: toml::Table,
}

/// Application identity.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AppSection {
    /// Application name, used as the default service name.
    pub name: String,

    /// Deployment environment label (e.g. "dev", "prod").
    pub env: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "ignition-app".to_string(),
            env: "dev".to_string(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (e.g. "0.0.0.0").
    pub host: String,

    /// Port to bind. `0` asks the OS for an ephemeral port.
    pub port: u16,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Deadline for draining in-flight requests on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl ServerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_connections: 10_000,
            request_timeout_secs: 30,
            shutdown_timeout_secs: 5,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable, for development.
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directives (e.g. "info" or "info,hyper=warn").
    /// `RUST_LOG` takes precedence when set.
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Service discovery (Consul agent) configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CloudConfig {
    /// Register this instance on startup.
    pub enabled: bool,

    /// Base URL of the Consul agent.
    pub consul_address: String,

    /// Service name; falls back to `app.name`.
    pub service_name: Option<String>,

    /// Address other services should use to reach us; falls back to
    /// `server.host`.
    pub advertise_host: Option<String>,

    /// Path the registry probes for health.
    pub health_check_path: String,

    /// Health probe interval in seconds.
    pub health_check_interval_secs: u64,

    /// Tags attached to the registration.
    pub tags: Vec<String>,
}

impl CloudConfig {
    /// True when the section carries enough to build a registry client.
    pub fn is_empty(&self) -> bool {
        self.consul_address.trim().is_empty()
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            consul_address: "http://127.0.0.1:8500".to_string(),
            service_name: None,
            advertise_host: None,
            health_check_path: "/health".to_string(),
            health_check_interval_secs: 10,
            tags: Vec::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_uses_defaults() {
        let config: AppConfig = toml::from_str("[app]\nname = \"orders\"\n").unwrap();
        assert_eq!(config.app.name, "orders");
        assert_eq!(config.app.env, "dev");
        assert_eq!(config.server, ServerConfig::default());
        assert!(!config.cloud.enabled);
        assert!(config.settings.is_empty());
    }

    #[test]
    fn settings_table_is_free_form() {
        let doc = r#"
            [log]
            format = "json"

            [settings]
            greeting = "hello"
            retries = 3
        "#;
        let config: AppConfig = toml::from_str(doc).unwrap();
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.settings["greeting"].as_str(), Some("hello"));
        assert_eq!(config.settings["retries"].as_integer(), Some(3));
    }

    #[test]
    fn bind_address_joins_host_and_port() {
        let server = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..ServerConfig::default()
        };
        assert_eq!(server.bind_address(), "127.0.0.1:0");
    }
}
