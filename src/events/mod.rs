//! Lifecycle event subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap::on_boot / on_startup / on_shutdown
//!     → EventBus::register(phase, handler)   (setup, single-threaded)
//!
//! Orchestrator reaches a phase
//!     → EventBus::publish(phase, ctx)
//!     → handler #0 → handler #1 → ... (each awaited before the next)
//!     → first failure stops the phase → PhaseFailure
//! ```
//!
//! # Design Decisions
//! - Dispatch is on the caller's task; no background fan-out
//! - Panics inside handlers are caught and reported as failures
//! - No de-duplication: what is registered twice runs twice

pub mod bus;
pub mod handler;
pub mod phase;

pub use bus::{EventBus, HandlerError, PhaseFailure};
pub use handler::{handler_fn, BoxError, Handler, HandlerFn, HandlerResult};
pub use phase::Phase;
