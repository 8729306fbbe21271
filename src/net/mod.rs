//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → connection.rs (open-connection tracking)
//!     → serve.rs (hyper connection per task, axum router as service)
//!
//! Shutdown:
//!     serve.rs drain: stop accepting → graceful close → abort at deadline
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - Connection tasks live in a JoinSet owned by the serve task, so
//!   force-closing them is a single `shutdown()`

pub mod connection;
pub mod listener;
pub mod serve;

pub use listener::{Listener, ListenerError};
pub use serve::{serve, DrainError, DrainReport, ServerHandle};
