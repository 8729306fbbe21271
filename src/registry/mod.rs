//! Service discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap::discovery(instance, registry)
//!     → Startup handler:  registry.register(&instance)
//!     → Shutdown handler: registry.deregister()
//!
//! Bootstrap::default_discovery()
//!     → ServiceInstance::from_config + ConsulRegistry from [cloud]
//!     → health route mounted at cloud.health_check_path
//! ```
//!
//! # Design Decisions
//! - The registry remembers what it registered, so deregister takes no
//!   arguments
//! - Registration failures surface as startup handler failures (fatal);
//!   deregistration failures are only logged

pub mod consul;
pub mod instance;
pub mod memory;

use futures_util::future::BoxFuture;

pub use consul::ConsulRegistry;
pub use instance::{HealthCheck, ServiceInstance};
pub use memory::InMemoryRegistry;

/// Error type for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid registry address: {0}")]
    InvalidAddress(#[from] url::ParseError),

    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("registry rejected {operation}: {status} {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("no instance registered")]
    NotRegistered,

    #[error("[cloud] section has no registry address")]
    MissingAddress,

    #[error("health check path {0:?} must start with '/'")]
    InvalidHealthPath(String),
}

/// A service registry this process announces itself to.
pub trait ServiceRegistry: Send + Sync + 'static {
    fn register<'a>(&'a self, instance: &'a ServiceInstance) -> BoxFuture<'a, Result<(), RegistryError>>;

    /// Remove the instance previously passed to `register`.
    fn deregister(&self) -> BoxFuture<'_, Result<(), RegistryError>>;
}
