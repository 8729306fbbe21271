//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap::routes / Bootstrap::middleware   (setup)
//!     → server.rs HttpStack collects RouterFn closures
//!
//! Orchestrator, after the boot phase:
//!     → HttpStack::build(ctx) → axum Router
//!         set request id → propagate id → trace span → catch panic
//!         → timeout → body limit → metrics → Extension<Context>
//!         → user middleware (first registered = outermost) → routes
//!     → net::serve
//! ```

pub mod health;
pub mod request;
pub mod server;

pub use health::health_route;
pub use request::X_REQUEST_ID;
pub use server::{HttpStack, RouterFn};
