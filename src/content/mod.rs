//! Collaborators consulted by the rewrite engine.
//!
//! # Data Flow
//! ```text
//! rewrite engine
//!     → ContentStore (media item version, access and tracking metadata)
//!     → FileStore (static file existence and last write time)
//! http layer
//!     → SiteResolver (Host header → CDN hostname, language)
//! ```
//!
//! # Design Decisions
//! - Traits sit at the seam so the engine never depends on a concrete store
//! - Every fallible call returns `CollaboratorError`; the engine catches it
//! - Implementations are Send + Sync and shared via Arc across requests

pub mod files;
pub mod manifest;
pub mod sites;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use files::WebRootFiles;
pub use manifest::{ManifestContentStore, ManifestEntry, TrackingInfo};
pub use sites::ConfiguredSites;

/// Errors raised by a collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Content store unavailable: {0}")]
    Unavailable(String),
}

/// A resolved media library item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    /// Stable item identity used for memoizing access checks.
    pub id: String,
    /// Content path, e.g. `/sitecore/media library/img/photo`.
    pub path: String,
    pub language: String,
    pub version: u32,
    pub updated: DateTime<Utc>,
}

/// Media item lookup and metadata.
pub trait ContentStore: Send + Sync {
    /// Resolve an item by path. `version` selects an explicit version,
    /// otherwise the latest one is returned.
    fn resolve_item(
        &self,
        path: &str,
        language: &str,
        version: Option<u32>,
    ) -> Result<Option<MediaItem>, CollaboratorError>;

    /// Can the anonymous user read this item?
    fn is_publicly_accessible(&self, item: &MediaItem) -> Result<bool, CollaboratorError>;

    /// Does requesting this item need analytics processing?
    fn is_analytics_tracked(&self, item: &MediaItem) -> Result<bool, CollaboratorError>;
}

/// Static file metadata under the web root.
pub trait FileStore: Send + Sync {
    fn exists(&self, path: &str) -> bool;

    fn last_write_time(&self, path: &str) -> Result<DateTime<Utc>, CollaboratorError>;
}

/// Per-site settings keyed by request host.
pub trait SiteResolver: Send + Sync {
    /// CDN hostname for the site serving `host`. Empty or absent disables
    /// rewriting for that site.
    fn cdn_hostname_for(&self, host: &str) -> Option<String>;

    /// Content language for the site serving `host`.
    fn language_for(&self, host: &str) -> Option<String>;
}
