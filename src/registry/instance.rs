//! Description of this process as a registered service.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AppConfig;

/// How the registry should probe the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Full URL of the health endpoint.
    pub url: String,
    pub interval: Duration,
}

/// One running instance of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Unique per process, stable for its lifetime.
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, String>,
    pub health_check: Option<HealthCheck>,
}

impl ServiceInstance {
    /// A new instance with a random ID derived from `name`.
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        let name = name.into();
        Self {
            id: format!("{}-{}", name, Uuid::new_v4()),
            name,
            host: host.into(),
            port,
            tags: Vec::new(),
            metadata: HashMap::new(),
            health_check: None,
        }
    }

    /// Build the instance described by `[app]`, `[server]` and `[cloud]`.
    pub fn from_config(config: &AppConfig) -> Self {
        let cloud = &config.cloud;
        let name = cloud.service_name.clone().unwrap_or_else(|| config.app.name.clone());
        let host = cloud
            .advertise_host
            .clone()
            .unwrap_or_else(|| config.server.host.clone());
        let port = config.server.port;

        let mut instance = Self::new(name, host.clone(), port);
        instance.tags = cloud.tags.clone();
        instance.metadata.insert("env".to_string(), config.app.env.clone());
        instance.metadata.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
        instance.health_check = Some(HealthCheck {
            url: format!("http://{}:{}{}", host, port, cloud.health_check_path),
            interval: Duration::from_secs(cloud.health_check_interval_secs),
        });
        instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_prefers_cloud_overrides() {
        let mut config = AppConfig::default();
        config.app.name = "orders".into();
        config.server.port = 7000;
        config.cloud.advertise_host = Some("10.0.0.5".into());
        config.cloud.tags = vec!["blue".into()];

        let instance = ServiceInstance::from_config(&config);
        assert_eq!(instance.name, "orders");
        assert!(instance.id.starts_with("orders-"));
        assert_eq!(instance.host, "10.0.0.5");
        assert_eq!(instance.tags, vec!["blue".to_string()]);
        assert_eq!(instance.metadata["env"], "dev");
        assert_eq!(
            instance.health_check.unwrap().url,
            "http://10.0.0.5:7000/health"
        );

        config.cloud.service_name = Some("orders-api".into());
        assert_eq!(ServiceInstance::from_config(&config).name, "orders-api");
    }

    #[test]
    fn ids_are_unique() {
        let a = ServiceInstance::new("svc", "localhost", 1);
        let b = ServiceInstance::new("svc", "localhost", 1);
        assert_ne!(a.id, b.id);
    }
}
