//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the CDN rewrite proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Origin server the proxy forwards to.
    pub origin: OriginConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rewrite feature flags and engine settings.
    pub cdn: CdnConfig,

    /// Include/exclude regular expressions.
    pub patterns: PatternConfig,

    /// Sites served through the proxy.
    pub sites: Vec<SiteConfig>,

    /// Content collaborators (web root, media manifest).
    pub content: ContentConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Origin address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// CDN rewrite settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CdnConfig {
    /// Master switch for response body rewriting.
    pub enabled: bool,

    /// Append `min=1` to css/js urls and route them to the minify handler.
    pub minify_enabled: bool,

    /// Force rewritten urls onto https.
    pub match_protocol: bool,

    /// Append version/timestamp query parameters.
    pub filename_versioning: bool,

    /// Consult media item tracking metadata.
    pub analytics_enabled: bool,

    /// Capacity of each rewrite cache (e.g. "5MB").
    pub cache_size: String,

    /// Marker identifying media library urls.
    pub media_link_prefix: String,

    /// Content path the media link prefix maps to.
    pub media_library_root: String,

    /// Language used when the site does not define one.
    pub default_language: String,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            minify_enabled: false,
            match_protocol: true,
            filename_versioning: true,
            analytics_enabled: false,
            cache_size: "5MB".to_string(),
            media_link_prefix: "/media/".to_string(),
            media_library_root: "/sitecore/media library".to_string(),
            default_language: "en".to_string(),
        }
    }
}

/// Ordered regular expression lists.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PatternConfig {
    /// Urls that must never be rewritten (tracking endpoints, etc).
    pub exclude_urls: Vec<String>,

    /// Request paths whose response bodies are rewritten.
    pub process_requests: Vec<String>,

    /// Request paths exempted even if matched by `process_requests`.
    pub exclude_requests: Vec<String>,
}

/// A site served through the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Site identifier for logging.
    pub name: String,

    /// Host headers served by this site.
    pub hosts: Vec<String>,

    /// CDN hostname; empty disables rewriting for the site.
    #[serde(default)]
    pub cdn_hostname: String,

    /// Content language for media lookups.
    #[serde(default)]
    pub language: Option<String>,
}

/// Content collaborator settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Directory static file urls are resolved against.
    pub web_root: String,

    /// Optional JSON media manifest.
    pub manifest_path: Option<String>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            web_root: "./wwwroot".to_string(),
            manifest_path: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
