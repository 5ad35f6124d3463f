//! Structured logging.
//!
//! # Design Decisions
//! - Uses the tracing crate for structured logging
//! - `RUST_LOG` wins over the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `level` is the configured default (e.g. "info"); it applies to this crate
/// and to tower_http so request traces show up alongside rewrite events.
pub fn init_logging(level: &str) {
    let default_filter = format!("cdn_rewrite_proxy={level},tower_http={level}");

    let result = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    if let Err(e) = result {
        // A subscriber was already installed (tests, embedding hosts)
        tracing::debug!(error = %e, "Tracing subscriber already initialized");
    }
}
