//! Process-wide configuration store.
//!
//! Holds the current `AppConfig` behind an `ArcSwap`: reads are lock-free
//! and always return a fully built object, and a reload replaces the whole
//! object at once. A reader that already holds an `Arc<AppConfig>` keeps
//! seeing that version until it asks again.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::AppConfig;
use crate::observability::metrics;

/// Shared handle to the current configuration. Cloning is cheap and all
/// clones observe the same replacements.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    current: Arc<ArcSwap<AppConfig>>,
}

impl ConfigStore {
    pub fn new(config: AppConfig) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Build a store from a file; fails if the initial load fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_config(path).map(Self::new)
    }

    /// Latest successfully loaded configuration. Never blocks.
    pub fn current(&self) -> Arc<AppConfig> {
        self.current.load_full()
    }

    /// Atomically swap in a new configuration.
    pub fn replace(&self, config: AppConfig) {
        self.current.store(Arc::new(config));
    }

    /// Load `path` and replace on success. On failure the current
    /// configuration is left untouched and the error is returned.
    pub fn reload_from(&self, path: &Path) -> Result<(), ConfigError> {
        match load_config(path) {
            Ok(config) => {
                self.replace(config);
                metrics::record_config_reload(true);
                tracing::info!(path = %path.display(), "Configuration reloaded");
                Ok(())
            }
            Err(e) => {
                metrics::record_config_reload(false);
                Err(e)
            }
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
