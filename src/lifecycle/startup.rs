//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Build collaborators and the single shared rewrite engine
//! - Bind listeners
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::cache::SizeParseError;
use crate::config::loader::{load_config, ConfigError};
use crate::config::validation::validate_config;
use crate::config::ProxyConfig;
use crate::content::{CollaboratorError, ConfiguredSites, ManifestContentStore, WebRootFiles};
use crate::http::AppState;
use crate::rewrite::{CdnRewriter, RewritePatterns, RewriteSettings};

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid cache size: {0}")]
    CacheSize(#[from] SizeParseError),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to load media manifest: {0}")]
    Content(#[from] CollaboratorError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Load the config file, or validated defaults when no path is given.
pub fn load_configuration(path: Option<&Path>) -> Result<ProxyConfig, StartupError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => {
            let config = ProxyConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Build collaborators and the rewrite engine.
pub fn build_state(config: ProxyConfig) -> Result<AppState, StartupError> {
    let settings = RewriteSettings::from_config(&config.cdn)?;
    let patterns = RewritePatterns::from_config(&config.patterns)?;

    let content = Arc::new(match &config.content.manifest_path {
        Some(path) => ManifestContentStore::load_from_file(Path::new(path))?,
        None => {
            tracing::info!("No media manifest configured, media urls keep their origin host");
            ManifestContentStore::new()
        }
    });
    let files = Arc::new(WebRootFiles::new(&config.content.web_root));
    let sites = Arc::new(ConfiguredSites::from_config(&config.sites));

    tracing::info!(
        cache_capacity = settings.cache_capacity,
        exclude_urls = patterns.exclude_urls.len(),
        process_requests = patterns.process_requests.len(),
        exclude_requests = patterns.exclude_requests.len(),
        sites = config.sites.len(),
        "Rewrite engine configured"
    );

    let rewriter = Arc::new(CdnRewriter::new(settings, patterns, content.clone(), files));
    Ok(AppState::new(config, rewriter, sites, content))
}

/// Bind a TCP listener.
pub async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address).await.map_err(|source| StartupError::Bind {
        address: address.to_string(),
        source,
    })
}
