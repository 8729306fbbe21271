//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (logging.rs installs the subscriber)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Metrics endpoint (Prometheus scrape), when enabled
//! ```
//!
//! # Design Decisions
//! - Structured fields rather than formatted strings
//! - Request ID (`x-request-id`) is attached to every HTTP span
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
