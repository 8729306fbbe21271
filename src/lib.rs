//! Application lifecycle orchestration for Tokio/Axum services.
//!
//! # Architecture Overview
//!
//! ```text
//!   Bootstrap (setup)                         Orchestrator (run)
//!   ─────────────────                         ──────────────────
//!   on_boot / on_startup / on_shutdown  ───▶  events::EventBus ──publish(phase)──▶ handlers
//!   routes / middleware                 ───▶  http::HttpStack  ──build──▶ axum Router
//!   discovery                           ───▶  registry (startup/shutdown handlers)
//!                                                    │
//!                                                    ▼
//!   config::ConfigStore ◀── config::ConfigWatcher    net::serve (listener + drain)
//!          ▲                                         │
//!          └───────────── Context ◀──────────────────┘
//!                 (config, shutdown, extensions)
//! ```
//!
//! Cross-cutting: `observability` (tracing subscriber, Prometheus metrics)
//! and `lifecycle::signals` (SIGINT/SIGTERM/SIGHUP).

// Core subsystems
pub mod config;
pub mod events;
pub mod http;
pub mod lifecycle;
pub mod net;

// Integrations
pub mod registry;

// Cross-cutting concerns
pub mod observability;

pub use config::{AppConfig, ConfigStore};
pub use events::{handler_fn, Handler, Phase};
pub use lifecycle::{Bootstrap, Context, LifecycleError, LifecycleState, Shutdown};
