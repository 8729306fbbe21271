//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Setup (builder.rs):
//!     Bootstrap collects handlers, routes, middleware, options
//!     → into_orchestrator() registers handlers on the EventBus
//!
//! Run (orchestrator.rs):
//!     Booting      → publish Boot
//!     Starting     → build HTTP stack → publish Startup → bind
//!     Running      → serve until the shutdown signal
//!     ShuttingDown → publish Shutdown → drain (bounded)
//!     Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger (first one wins)
//!     SIGHUP → config reload
//! ```
//!
//! # Design Decisions
//! - Boot and startup failures are fatal and nothing is bound
//! - Shutdown handler failures are logged; the drain still happens
//! - Shutdown has timeout: remaining connections are closed at the deadline

pub mod builder;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use builder::Bootstrap;
pub use context::Context;
pub use error::{LifecycleError, Result};
pub use orchestrator::Orchestrator;
pub use shutdown::Shutdown;
pub use signals::SignalTrap;
pub use state::LifecycleState;
