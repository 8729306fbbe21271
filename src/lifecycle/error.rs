//! Lifecycle error types.

use crate::config::ConfigError;
use crate::events::PhaseFailure;
use crate::net::{DrainError, ListenerError};
use crate::registry::RegistryError;

/// Why `run()` did not end cleanly.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Configuration could not be loaded or watched.
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),

    /// A boot or startup handler failed; the listener was never bound.
    #[error(transparent)]
    Phase(#[from] PhaseFailure),

    /// The listener could not be bound; the server never ran.
    #[error(transparent)]
    Bind(#[from] ListenerError),

    /// Assembling routes or middleware panicked, e.g. on a duplicate path.
    #[error("failed to build routes: {0}")]
    Routes(String),

    /// Shutdown completed but the drain was forced or failed.
    #[error("forced shutdown: {0}")]
    Drain(DrainError),

    #[error("service discovery: {0}")]
    Discovery(#[from] RegistryError),
}

impl LifecycleError {
    /// Process exit status for this error. Clean shutdown is 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            // sysexits EX_CONFIG
            LifecycleError::Config(_) | LifecycleError::Watch(_) => 78,
            _ => 1,
        }
    }
}

/// A specialized Result type for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;
