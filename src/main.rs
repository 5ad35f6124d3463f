//! CDN Rewrite Proxy
//!
//! Sits in front of an origin server and points asset references in HTML
//! responses at a CDN host.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌──────────────────────────────────────────────┐
//!     ───────────────────▶│ http::server                                  │
//!                         │   request id → minify intercept → eligibility │──────▶ Origin
//!                         └──────────────────────────────────────────────┘
//!                                                                    │
//!     Client Response     ┌──────────────────────────────────────────────┐
//!     ◀───────────────────│ filter (buffer until </html>)                 │◀───────┘
//!                         │   → rewrite::document → rewrite::engine       │
//!                         │       → cache / classifier / content          │
//!                         └──────────────────────────────────────────────┘
//!
//!     Cross-cutting: config, observability, lifecycle, admin API
//! ```

use clap::Parser;
use std::path::PathBuf;

use cdn_rewrite_proxy::admin::setup_admin_router;
use cdn_rewrite_proxy::http::HttpServer;
use cdn_rewrite_proxy::lifecycle::{self, Shutdown};
use cdn_rewrite_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "cdn-rewrite-proxy")]
#[command(about = "Reverse proxy that rewrites asset urls onto a CDN", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = lifecycle::load_configuration(args.config.as_deref())?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cdn-rewrite-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.origin.address,
        cdn_enabled = config.cdn.enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let state = lifecycle::build_state(config)?;
    let shutdown = Shutdown::new();
    lifecycle::spawn_signal_listener(shutdown.clone());

    let admin_task = if state.config.admin.enabled {
        let listener = lifecycle::bind(&state.config.admin.bind_address).await?;
        tracing::info!(address = %listener.local_addr()?, "Admin API listening");
        let router = setup_admin_router(state.clone());
        let mut stop = shutdown.subscribe();
        Some(tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API failed");
            }
        }))
    } else {
        None
    };

    let listener = lifecycle::bind(&state.config.listener.bind_address).await?;
    HttpServer::new(state).run(listener, shutdown.subscribe()).await?;

    if let Some(task) = admin_task {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
