//! Consul agent client.

use std::sync::Mutex;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::json;
use url::Url;

use crate::config::CloudConfig;
use crate::registry::{RegistryError, ServiceInstance, ServiceRegistry};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Registers the instance with the local Consul agent over its HTTP API.
pub struct ConsulRegistry {
    base: Url,
    client: reqwest::Client,
    registered: Mutex<Option<String>>,
}

impl ConsulRegistry {
    pub fn new(address: &str) -> Result<Self, RegistryError> {
        let base = Url::parse(address)?;
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base,
            client,
            registered: Mutex::new(None),
        })
    }

    pub fn from_config(config: &CloudConfig) -> Result<Self, RegistryError> {
        Self::new(&config.consul_address)
    }

    fn endpoint(&self, path: &str) -> Result<Url, RegistryError> {
        Ok(self.base.join(path)?)
    }

    async fn put(
        &self,
        operation: &'static str,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<(), RegistryError> {
        let mut request = self.client.put(url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(RegistryError::Rejected {
            operation,
            status: status.as_u16(),
            body,
        })
    }
}

fn registration_payload(instance: &ServiceInstance) -> serde_json::Value {
    let mut payload = json!({
        "ID": instance.id,
        "Name": instance.name,
        "Address": instance.host,
        "Port": instance.port,
        "Tags": instance.tags,
        "Meta": instance.metadata,
    });
    if let Some(check) = &instance.health_check {
        payload["Check"] = json!({
            "HTTP": check.url,
            "Interval": format!("{}s", check.interval.as_secs().max(1)),
            "DeregisterCriticalServiceAfter": "1m",
        });
    }
    payload
}

impl ServiceRegistry for ConsulRegistry {
    fn register<'a>(&'a self, instance: &'a ServiceInstance) -> BoxFuture<'a, Result<(), RegistryError>> {
        Box::pin(async move {
            let url = self.endpoint("/v1/agent/service/register")?;
            self.put("register", url, Some(registration_payload(instance))).await?;
            if let Ok(mut registered) = self.registered.lock() {
                *registered = Some(instance.id.clone());
            }
            tracing::info!(
                service = %instance.name,
                id = %instance.id,
                consul = %self.base,
                "Service registered with Consul"
            );
            Ok(())
        })
    }

    fn deregister(&self) -> BoxFuture<'_, Result<(), RegistryError>> {
        Box::pin(async move {
            let id = self
                .registered
                .lock()
                .ok()
                .and_then(|r| r.clone())
                .ok_or(RegistryError::NotRegistered)?;
            let url = self.endpoint(&format!("/v1/agent/service/deregister/{id}"))?;
            self.put("deregister", url, None).await?;
            if let Ok(mut registered) = self.registered.lock() {
                registered.take();
            }
            tracing::info!(id = %id, "Service deregistered from Consul");
            Ok(())
        })
    }
}
