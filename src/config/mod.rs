//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML; CONFIG_FILE or ./config.toml)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → store.rs (ArcSwap<AppConfig>, shared via Context)
//!
//! On change (file watch or SIGHUP):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap in store.rs
//!     → readers pick up the new Arc on their next current()
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - A failed reload keeps the last good config and is only logged

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{
    load_config, parse_config, ConfigError, ConfigSource, CONFIG_FILE_ENV, DEFAULT_CONFIG_FILE,
};
pub use schema::{
    AppConfig, AppSection, CloudConfig, LogConfig, LogFormat, ObservabilityConfig, ServerConfig,
};
pub use store::ConfigStore;
pub use validation::ValidationError;
pub use watcher::{ConfigWatcher, ReloadTrigger, WatchHandle};
