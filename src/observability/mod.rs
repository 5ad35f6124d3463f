//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Catch-and-log paths in the rewrite core report through `tracing::error!`
//! - Request ID flows through the HTTP layer into log fields
//! - Metrics are cheap no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
