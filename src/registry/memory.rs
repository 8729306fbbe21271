//! In-process registry, for local runs and tests.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use futures_util::future::BoxFuture;

use crate::registry::{RegistryError, ServiceInstance, ServiceRegistry};

/// Registry keeping instances in a shared map. Clones share the map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    instances: Arc<DashMap<String, ServiceInstance>>,
    registered: Arc<Mutex<Option<String>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instances(&self) -> Vec<ServiceInstance> {
        self.instances.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl ServiceRegistry for InMemoryRegistry {
    fn register<'a>(&'a self, instance: &'a ServiceInstance) -> BoxFuture<'a, Result<(), RegistryError>> {
        Box::pin(async move {
            self.instances.insert(instance.id.clone(), instance.clone());
            if let Ok(mut registered) = self.registered.lock() {
                *registered = Some(instance.id.clone());
            }
            tracing::info!(service = %instance.name, id = %instance.id, "Service registered");
            Ok(())
        })
    }

    fn deregister(&self) -> BoxFuture<'_, Result<(), RegistryError>> {
        Box::pin(async move {
            let id = self
                .registered
                .lock()
                .ok()
                .and_then(|mut r| r.take())
                .ok_or(RegistryError::NotRegistered)?;
            self.instances.remove(&id);
            tracing::info!(id = %id, "Service deregistered");
            Ok(())
        })
    }
}
