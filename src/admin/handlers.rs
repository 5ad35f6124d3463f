use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;

use crate::cache::CacheStats;
use crate::content::SiteResolver;
use crate::http::server::AppState;
use crate::rewrite::{RewriteOutcome, RewriteRequest};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub cdn_enabled: bool,
    pub minify_enabled: bool,
    pub match_protocol: bool,
    pub filename_versioning: bool,
    pub analytics_enabled: bool,
    pub sites: usize,
    pub media_items: usize,
    pub total_requests: usize,
}

#[derive(Deserialize)]
pub struct RewriteQuery {
    pub url: String,
    /// Request host used to pick the site; no host means no CDN hostname.
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Serialize)]
pub struct RewriteReport {
    pub input: String,
    pub output: String,
    pub outcome: &'static str,
    pub cdn_hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct ReloadReport {
    pub items: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let cdn = &state.config.cdn;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        cdn_enabled: cdn.enabled,
        minify_enabled: cdn.minify_enabled,
        match_protocol: cdn.match_protocol,
        filename_versioning: cdn.filename_versioning,
        analytics_enabled: cdn.analytics_enabled,
        sites: state.config.sites.len(),
        media_items: state.content.len(),
        total_requests: state.request_count.load(Ordering::Relaxed),
    })
}

pub async fn get_cache(State(state): State<AppState>) -> Json<Vec<CacheStats>> {
    Json(state.rewriter.cache_stats())
}

pub async fn post_rewrite(State(state): State<AppState>, Json(query): Json<RewriteQuery>) -> Json<RewriteReport> {
    let host = query.host.as_deref().unwrap_or_default();
    let site = state.rewriter.site_context(
        state.sites.cdn_hostname_for(host).unwrap_or_default(),
        state.sites.language_for(host),
    );

    let outcome = state.rewriter.rewrite_request(&RewriteRequest {
        url: &query.url,
        cdn_hostname: &site.cdn_hostname,
        language: &site.language,
        flags: state.rewriter.settings().flags,
    });

    let error = match &outcome {
        RewriteOutcome::Failed { error, .. } => Some(error.to_string()),
        _ => None,
    };
    Json(RewriteReport {
        outcome: outcome.kind(),
        output: outcome.into_url(),
        input: query.url,
        cdn_hostname: site.cdn_hostname,
        error,
    })
}

pub async fn post_reload(State(state): State<AppState>) -> Result<Json<ReloadReport>, (StatusCode, String)> {
    match state.content.reload() {
        Ok(items) => {
            // Cached urls and access checks may be stale now.
            state.rewriter.clear_url_cache();
            Ok(Json(ReloadReport { items }))
        }
        Err(e) => {
            tracing::error!(error = %e, "Media manifest reload failed");
            Err((StatusCode::CONFLICT, e.to_string()))
        }
    }
}
