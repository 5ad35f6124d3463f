//! Url rewrite engine.
//!
//! # Responsibilities
//! - Decide whether a single url reference may be CDN-qualified
//! - Substitute the CDN host, force https and add cache-busting parameters
//! - Memoize results and per-item access checks
//! - Never fail past its boundary: errors degrade to the input url
//!
//! # Design Decisions
//! - One engine instance is built at startup and shared via Arc
//! - Cache keys carry the "https" scheme tag, the CDN hostname, the
//!   language and the flags, so sites sharing an engine never see each
//!   other's results
//! - Private or analytics-tracked media keeps its origin url

use percent_encoding::percent_decode_str;
use std::sync::Arc;
use url::Url;

use crate::cache::{BoundedCache, CacheStats, SizeParseError, parse_size};
use crate::config::{CdnConfig, PatternConfig};
use crate::content::{ContentStore, FileStore, MediaItem};
use crate::observability::metrics;
use crate::rewrite::classifier::{PatternClassifier, PatternSet};
use crate::rewrite::urls;
use crate::rewrite::{RewriteError, RewriteOutcome};

/// Query parameter whose presence opts a url out of rewriting.
pub const STOP_TOKEN: &str = "ncdn";

/// Scheme tag prefixed to url cache keys.
const CACHE_KEY_TAG: &str = "https";

/// Per-call feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteFlags {
    pub match_protocol: bool,
    pub filename_versioning: bool,
    pub minify: bool,
}

/// Engine-wide settings.
#[derive(Debug, Clone)]
pub struct RewriteSettings {
    /// Flags used by [`CdnRewriter::rewrite`].
    pub flags: RewriteFlags,
    pub analytics_enabled: bool,
    pub media_link_prefix: String,
    pub media_library_root: String,
    pub default_language: String,
    /// Capacity of each cache in bytes.
    pub cache_capacity: usize,
}

impl RewriteSettings {
    pub fn from_config(config: &CdnConfig) -> Result<Self, SizeParseError> {
        Ok(Self {
            flags: RewriteFlags {
                match_protocol: config.match_protocol,
                filename_versioning: config.filename_versioning,
                minify: config.minify_enabled,
            },
            analytics_enabled: config.analytics_enabled,
            media_link_prefix: config.media_link_prefix.clone(),
            media_library_root: config.media_library_root.clone(),
            default_language: config.default_language.clone(),
            cache_capacity: parse_size(&config.cache_size)?,
        })
    }
}

impl Default for RewriteSettings {
    fn default() -> Self {
        Self {
            flags: RewriteFlags {
                match_protocol: true,
                filename_versioning: true,
                minify: false,
            },
            analytics_enabled: false,
            media_link_prefix: "/media/".to_string(),
            media_library_root: "/sitecore/media library".to_string(),
            default_language: "en".to_string(),
            cache_capacity: 5 * 1024 * 1024,
        }
    }
}

/// The three configured pattern sets.
#[derive(Debug, Clone, Default)]
pub struct RewritePatterns {
    pub exclude_urls: PatternSet,
    pub process_requests: PatternSet,
    pub exclude_requests: PatternSet,
}

impl RewritePatterns {
    pub fn from_config(config: &PatternConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            exclude_urls: PatternSet::compile(&config.exclude_urls)?,
            process_requests: PatternSet::compile(&config.process_requests)?,
            exclude_requests: PatternSet::compile(&config.exclude_requests)?,
        })
    }
}

/// A single rewrite call.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRequest<'a> {
    pub url: &'a str,
    /// Empty disables host substitution.
    pub cdn_hostname: &'a str,
    pub language: &'a str,
    pub flags: RewriteFlags,
}

enum MediaDecision {
    /// No media item path could be derived; keep the host/scheme changes.
    Keep,
    /// Unresolvable, private or tracked item: emit the original url.
    Original,
    Versioned { version: u32, updated: chrono::DateTime<chrono::Utc> },
}

/// Per-site context a response is rewritten under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteContext {
    /// Empty disables host substitution.
    pub cdn_hostname: String,
    pub language: String,
}

impl SiteContext {
    pub fn new(cdn_hostname: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            cdn_hostname: cdn_hostname.into(),
            language: language.into(),
        }
    }
}

/// Rewrites asset urls onto the CDN.
pub struct CdnRewriter {
    settings: RewriteSettings,
    base: Url,
    url_cache: BoundedCache<String>,
    excluded_urls: PatternClassifier,
    included_requests: PatternClassifier,
    excluded_requests: PatternClassifier,
    content: Arc<dyn ContentStore>,
    files: Arc<dyn FileStore>,
}

impl CdnRewriter {
    pub fn new(
        settings: RewriteSettings,
        patterns: RewritePatterns,
        content: Arc<dyn ContentStore>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        let capacity = settings.cache_capacity;
        Self {
            base: urls::origin_base(),
            url_cache: BoundedCache::new("CDNUrl", capacity),
            excluded_urls: PatternClassifier::new("CDNExcludes", patterns.exclude_urls, capacity),
            included_requests: PatternClassifier::new("CDNIncludes", patterns.process_requests, capacity),
            excluded_requests: PatternClassifier::new("CDNRequestExcludes", patterns.exclude_requests, capacity),
            settings,
            content,
            files,
        }
    }

    pub fn settings(&self) -> &RewriteSettings {
        &self.settings
    }

    /// Rewrite `input` for `cdn_hostname` with the engine's default flags.
    /// Always returns a usable url.
    pub fn rewrite(&self, input: &str, cdn_hostname: &str) -> String {
        self.rewrite_request(&RewriteRequest {
            url: input,
            cdn_hostname,
            language: &self.settings.default_language,
            flags: self.settings.flags,
        })
        .into_url()
    }

    /// Context for a site, falling back to the default language.
    pub fn site_context(&self, cdn_hostname: impl Into<String>, language: Option<String>) -> SiteContext {
        SiteContext::new(
            cdn_hostname,
            language.unwrap_or_else(|| self.settings.default_language.clone()),
        )
    }

    /// Rewrite `input` for a site with the engine's default flags.
    pub fn rewrite_for_site(&self, input: &str, site: &SiteContext) -> String {
        self.rewrite_request(&RewriteRequest {
            url: input,
            cdn_hostname: &site.cdn_hostname,
            language: &site.language,
            flags: self.settings.flags,
        })
        .into_url()
    }

    /// Rewrite with explicit per-call context.
    pub fn rewrite_request(&self, request: &RewriteRequest<'_>) -> RewriteOutcome {
        let outcome = self.rewrite_inner(request);
        metrics::record_rewrite(outcome.kind());
        outcome
    }

    fn rewrite_inner(&self, request: &RewriteRequest<'_>) -> RewriteOutcome {
        let input = request.url;
        let cache_key = cache_key(request);

        if let Some(cached) = self.url_cache.get(&cache_key) {
            return classify(input, cached);
        }

        if input.trim().is_empty() || urls::is_never_qualified(input) {
            return RewriteOutcome::Unchanged(input.to_string());
        }

        match self.transform(request) {
            Ok(Some(output)) => {
                self.url_cache.set(cache_key, output.clone());
                classify(input, output)
            }
            Ok(None) => RewriteOutcome::Unchanged(input.to_string()),
            Err(error) => {
                tracing::error!(
                    cdn_hostname = %request.cdn_hostname,
                    url = %input,
                    error = %error,
                    "ReplaceMediaUrl failed"
                );
                RewriteOutcome::Failed { url: input.to_string(), error }
            }
        }
    }

    /// Returns None when the reference resolves off the origin.
    fn transform(&self, request: &RewriteRequest<'_>) -> Result<Option<String>, RewriteError> {
        let Some(original) = urls::normalize(&self.base, request.url)? else {
            return Ok(None);
        };
        let mut url = original.clone();

        if urls::has_query_key(&url, STOP_TOKEN) {
            urls::remove_query_key(&mut url, STOP_TOKEN);
            return Ok(Some(urls::serialize(&url)));
        }

        if !request.cdn_hostname.is_empty() {
            urls::apply_hostname(&mut url, request.cdn_hostname)?;
        }
        if request.flags.match_protocol {
            urls::force_https(&mut url)?;
        }

        if request.flags.filename_versioning {
            if self.media_prefix_end(url.path()).is_some() {
                match self.media_decision(&url, request.language)? {
                    MediaDecision::Keep => {}
                    MediaDecision::Original => return Ok(Some(urls::serialize(&original))),
                    MediaDecision::Versioned { version, updated } => {
                        urls::set_query_value(&mut url, "vs", &version.to_string());
                        urls::set_query_value(&mut url, "d", &urls::iso_timestamp(updated));
                    }
                }
            } else {
                self.stamp_static_file(&mut url, request.flags)?;
            }
        }

        Ok(Some(urls::serialize(&url)))
    }

    fn media_decision(&self, url: &Url, language: &str) -> Result<MediaDecision, RewriteError> {
        let Some(item_path) = self.media_item_path(url.path()) else {
            return Ok(MediaDecision::Keep);
        };
        let version = urls::query_value(url, "vs").and_then(|v| v.parse::<u32>().ok());

        let Some(item) = self.content.resolve_item(&item_path, language, version)? else {
            tracing::debug!(path = %item_path, ?version, "Media item not found, keeping origin url");
            return Ok(MediaDecision::Original);
        };

        if !self.is_media_publicly_accessible(&item)? || self.is_media_analytics_tracked(&item) {
            tracing::debug!(item = %item.id, "Media item is private or tracked, keeping origin url");
            return Ok(MediaDecision::Original);
        }

        Ok(MediaDecision::Versioned {
            version: item.version,
            updated: item.updated,
        })
    }

    fn stamp_static_file(&self, url: &mut Url, flags: RewriteFlags) -> Result<(), RewriteError> {
        let path = url.path().to_string();

        if self.files.exists(&path) {
            let written = self.files.last_write_time(&path)?;
            urls::set_query_value(url, "d", &urls::iso_timestamp(written));
        }

        if flags.minify && (path.ends_with(".css") || path.ends_with(".js")) {
            urls::set_query_value(url, "min", "1");
        }
        Ok(())
    }

    fn media_prefix_end(&self, path: &str) -> Option<usize> {
        urls::media_prefix_end(path, &self.settings.media_link_prefix)
    }

    /// Map a media url path onto its content path:
    /// `/media/img/photo.ashx` → `/sitecore/media library/img/photo`.
    pub fn media_item_path(&self, path: &str) -> Option<String> {
        let start = self.media_prefix_end(path)?;
        let decoded = percent_decode_str(&path[start..]).decode_utf8_lossy();

        let stem = match decoded.rsplit_once('.') {
            Some((stem, ext)) if !ext.contains('/') => stem,
            _ => decoded.as_ref(),
        };
        let stem = stem.trim_matches('/');
        if stem.is_empty() {
            return None;
        }

        Some(format!(
            "{}/{}",
            self.settings.media_library_root.trim_end_matches('/'),
            stem
        ))
    }

    /// Anonymous-read check, memoized per item id.
    pub fn is_media_publicly_accessible(&self, item: &MediaItem) -> Result<bool, RewriteError> {
        let key = format!("{}_public", item.id);
        if let Some(cached) = self.url_cache.get(&key) {
            return Ok(cached == "true");
        }

        let public = self.content.is_publicly_accessible(item)?;
        self.url_cache.set(key, public.to_string());
        Ok(public)
    }

    /// Analytics tracking check, memoized per item id. Lookup failures are
    /// logged and count as "not tracked".
    pub fn is_media_analytics_tracked(&self, item: &MediaItem) -> bool {
        if !self.settings.analytics_enabled {
            return false;
        }

        let key = format!("{}_tracked", item.id);
        if let Some(cached) = self.url_cache.get(&key) {
            return cached == "true";
        }

        match self.content.is_analytics_tracked(item) {
            Ok(tracked) => {
                self.url_cache.set(key, tracked.to_string());
                tracked
            }
            Err(e) => {
                tracing::error!(item = %item.id, error = %e, "IsMediaAnalyticsTracked failed");
                false
            }
        }
    }

    /// Is this url excluded from rewriting?
    pub fn is_url_excluded(&self, url: &str) -> bool {
        self.excluded_urls.matches(url)
    }

    /// Should the response body of this request be processed?
    pub fn should_process_request(&self, url: &str) -> bool {
        self.included_requests.matches(url)
    }

    /// Is this request exempted from processing?
    pub fn should_exclude_request(&self, url: &str) -> bool {
        self.excluded_requests.matches(url)
    }

    /// Included and not exempted.
    pub fn is_request_eligible(&self, url: &str) -> bool {
        self.should_process_request(url) && !self.should_exclude_request(url)
    }

    /// Drop memoized urls and per-item access checks.
    pub fn clear_url_cache(&self) {
        self.url_cache.clear();
    }

    pub fn cache_stats(&self) -> Vec<CacheStats> {
        vec![
            self.url_cache.stats(),
            self.excluded_urls.stats(),
            self.included_requests.stats(),
            self.excluded_requests.stats(),
        ]
    }
}

fn cache_key(request: &RewriteRequest<'_>) -> String {
    let flags = request.flags;
    format!(
        "{}|{}|{}|{}{}{}|{}",
        CACHE_KEY_TAG,
        request.cdn_hostname.to_ascii_lowercase(),
        request.language.to_ascii_lowercase(),
        u8::from(flags.match_protocol),
        u8::from(flags.filename_versioning),
        u8::from(flags.minify),
        request.url
    )
}

fn classify(input: &str, output: String) -> RewriteOutcome {
    if output == input {
        RewriteOutcome::Unchanged(output)
    } else {
        RewriteOutcome::Rewritten(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::testing::{photo, rewriter, FakeContent, FakeFiles};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::Ordering;

    const CDN: &str = "cdn.example.com";

    #[test]
    fn test_media_url_versioned() {
        let content = FakeContent::with_items(vec![photo(3, true)]);
        let engine = rewriter(content, FakeFiles::default(), RewriteSettings::default());

        assert_eq!(
            engine.rewrite("/media/img/photo.ashx?w=100", CDN),
            "https://cdn.example.com/media/img/photo.ashx?w=100&vs=3&d=20130101T000000"
        );
    }

    #[test]
    fn test_private_media_keeps_origin_url() {
        let content = FakeContent::with_items(vec![photo(3, false)]);
        let engine = rewriter(content, FakeFiles::default(), RewriteSettings::default());

        let outcome = engine.rewrite_request(&RewriteRequest {
            url: "/media/img/photo.ashx?w=100",
            cdn_hostname: CDN,
            language: "en",
            flags: engine.settings().flags,
        });
        assert!(matches!(outcome, RewriteOutcome::Unchanged(_)));
        assert_eq!(outcome.url(), "/media/img/photo.ashx?w=100");
    }

    #[test]
    fn test_unknown_media_keeps_origin_url() {
        let engine = rewriter(FakeContent::default(), FakeFiles::default(), RewriteSettings::default());
        assert_eq!(engine.rewrite("~/media/missing.ashx", CDN), "/~/media/missing.ashx");
    }

    #[test]
    fn test_tracked_media_keeps_origin_url() {
        let content = FakeContent::with_items(vec![photo(3, true)]);
        content.tracked.store(true, Ordering::SeqCst);
        let settings = RewriteSettings {
            analytics_enabled: true,
            ..RewriteSettings::default()
        };
        let engine = rewriter(content, FakeFiles::default(), settings);
        assert_eq!(engine.rewrite("/media/img/photo.ashx", CDN), "/media/img/photo.ashx");
    }

    #[test]
    fn test_tracking_ignored_when_analytics_disabled() {
        let content = FakeContent::with_items(vec![photo(3, true)]);
        content.tracked.store(true, Ordering::SeqCst);
        let engine = rewriter(content.clone(), FakeFiles::default(), RewriteSettings::default());

        assert!(engine.rewrite("/media/img/photo.ashx", CDN).starts_with("https://cdn.example.com/"));
        assert_eq!(content.tracking_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_explicit_version_replaces_query_value() {
        let content = FakeContent::with_items(vec![photo(3, true)]);
        let engine = rewriter(content.clone(), FakeFiles::default(), RewriteSettings::default());

        let out = engine.rewrite("/media/img/photo.ashx?vs=2", CDN);
        assert_eq!(out, "https://cdn.example.com/media/img/photo.ashx?vs=3&d=20130101T000000");
        assert_eq!(*content.last_version.lock(), Some(2));
    }

    #[test]
    fn test_never_qualified_inputs_unchanged() {
        let engine = rewriter(FakeContent::default(), FakeFiles::default(), RewriteSettings::default());
        for url in [
            "http://other.example.org/a.png",
            "HTTPS://other.example.org/a.png",
            "//other.example.org/a.png",
            "data:image/gif;base64,R0lGOD",
            "Mailto:someone@example.com",
            "ftp://files.example.com/a.zip",
            "NEWS:comp.lang.rust",
        ] {
            let outcome = engine.rewrite_request(&RewriteRequest {
                url,
                cdn_hostname: CDN,
                language: "en",
                flags: engine.settings().flags,
            });
            assert!(matches!(outcome, RewriteOutcome::Unchanged(_)), "{}", url);
            assert_eq!(outcome.url(), url);
        }
    }

    #[test]
    fn test_stop_token_suppresses_rewrite() {
        let content = FakeContent::with_items(vec![photo(3, true)]);
        let engine = rewriter(content.clone(), FakeFiles::default(), RewriteSettings::default());

        assert_eq!(engine.rewrite("/media/img/photo.ashx?ncdn=1&w=5", CDN), "/media/img/photo.ashx?w=5");
        assert_eq!(engine.rewrite("/styles/a.css?NCDN", CDN), "/styles/a.css");
        assert_eq!(engine.rewrite("/img/a.png?ncdn=0", CDN), "/img/a.png");
        assert_eq!(content.resolve_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rewriting_cdn_url_is_noop() {
        let content = FakeContent::with_items(vec![photo(3, true)]);
        let engine = rewriter(content, FakeFiles::default(), RewriteSettings::default());

        let once = engine.rewrite("/media/img/photo.ashx?w=100", CDN);
        let twice = engine.rewrite(&once, CDN);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_static_file_timestamp_and_minify() {
        let files = FakeFiles::with_file("/styles/base.css", Utc.with_ymd_and_hms(2020, 5, 4, 3, 2, 1).unwrap());
        let settings = RewriteSettings {
            flags: RewriteFlags {
                match_protocol: true,
                filename_versioning: true,
                minify: true,
            },
            ..RewriteSettings::default()
        };
        let engine = rewriter(FakeContent::default(), files, settings);

        assert_eq!(
            engine.rewrite("/styles/base.css", CDN),
            "https://cdn.example.com/styles/base.css?d=20200504T030201&min=1"
        );
        // Missing file: no timestamp, minify still applies
        assert_eq!(engine.rewrite("/js/app.js", CDN), "https://cdn.example.com/js/app.js?min=1");
        assert_eq!(engine.rewrite("/img/a.png", CDN), "https://cdn.example.com/img/a.png");
    }

    #[test]
    fn test_without_versioning_or_protocol() {
        let settings = RewriteSettings {
            flags: RewriteFlags {
                match_protocol: false,
                filename_versioning: false,
                minify: false,
            },
            ..RewriteSettings::default()
        };
        let content = FakeContent::with_items(vec![photo(3, true)]);
        let engine = rewriter(content.clone(), FakeFiles::default(), settings);

        assert_eq!(engine.rewrite("media/img/photo.ashx", CDN), "http://cdn.example.com/media/img/photo.ashx");
        assert_eq!(content.resolve_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_without_cdn_hostname_stays_relative() {
        let content = FakeContent::with_items(vec![photo(3, true)]);
        let engine = rewriter(content, FakeFiles::default(), RewriteSettings::default());

        assert_eq!(
            engine.rewrite("/media/img/../img/photo.ashx", ""),
            "/media/img/photo.ashx?vs=3&d=20130101T000000"
        );
        assert_eq!(engine.rewrite("./img/a.png", ""), "/img/a.png");
    }

    #[test]
    fn test_collaborator_failure_returns_input() {
        let content = FakeContent::with_items(vec![photo(3, true)]);
        content.fail.store(true, Ordering::SeqCst);
        let engine = rewriter(content, FakeFiles::default(), RewriteSettings::default());

        let outcome = engine.rewrite_request(&RewriteRequest {
            url: "/media/img/photo.ashx?w=1",
            cdn_hostname: CDN,
            language: "en",
            flags: engine.settings().flags,
        });
        assert!(matches!(outcome, RewriteOutcome::Failed { error: RewriteError::Collaborator(_), .. }));
        assert_eq!(outcome.kind(), "failed");
        assert_eq!(outcome.into_url(), "/media/img/photo.ashx?w=1");
    }

    #[test]
    fn test_invalid_hostname_returns_input() {
        let engine = rewriter(FakeContent::default(), FakeFiles::default(), RewriteSettings::default());
        assert_eq!(engine.rewrite("/img/a.png", "bad host"), "/img/a.png");
    }

    #[test]
    fn test_results_are_cached() {
        let content = FakeContent::with_items(vec![photo(3, true)]);
        let engine = rewriter(content.clone(), FakeFiles::default(), RewriteSettings::default());

        let first = engine.rewrite("/media/img/photo.ashx", CDN);
        let second = engine.rewrite("/media/img/photo.ashx", CDN);
        assert_eq!(first, second);
        assert_eq!(content.resolve_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_access_check_memoized_per_item() {
        let content = FakeContent::with_items(vec![photo(3, true)]);
        let engine = rewriter(content.clone(), FakeFiles::default(), RewriteSettings::default());

        engine.rewrite("/media/img/photo.ashx?w=1", CDN);
        engine.rewrite("/media/img/photo.ashx?w=2", CDN);
        assert_eq!(content.resolve_calls.load(Ordering::SeqCst), 2);
        assert_eq!(content.access_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_media_item_path() {
        let engine = rewriter(FakeContent::default(), FakeFiles::default(), RewriteSettings::default());
        assert_eq!(
            engine.media_item_path("/~/media/Images/Hero%20Shot.ashx").as_deref(),
            Some("/sitecore/media library/Images/Hero Shot")
        );
        assert_eq!(
            engine.media_item_path("/media/img/photo").as_deref(),
            Some("/sitecore/media library/img/photo")
        );
        assert_eq!(
            engine.media_item_path("/-/Media/img/photo.ashx").as_deref(),
            Some("/sitecore/media library/img/photo")
        );
        assert_eq!(engine.media_item_path("/media/"), None);
        assert_eq!(engine.media_item_path("/styles/a.css"), None);
        assert_eq!(engine.media_item_path("/assets/media/site.css"), None);
    }

    #[test]
    fn test_nested_media_directory_is_static_asset() {
        let files = FakeFiles::with_file("/assets/media/site.css", Utc.with_ymd_and_hms(2020, 5, 4, 3, 2, 1).unwrap());
        let content = FakeContent::default();
        let engine = rewriter(content.clone(), files, RewriteSettings::default());

        assert_eq!(
            engine.rewrite("/assets/media/site.css", CDN),
            "https://cdn.example.com/assets/media/site.css?d=20200504T030201"
        );
        assert_eq!(content.resolve_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cached_results_are_per_hostname() {
        let engine = rewriter(FakeContent::default(), FakeFiles::default(), RewriteSettings::default());

        assert_eq!(engine.rewrite("/img/a.png", ""), "/img/a.png");
        assert_eq!(engine.rewrite("/img/a.png", CDN), "https://cdn.example.com/img/a.png");

        assert_eq!(engine.rewrite("/img/b.png", "cdn-a.example.com"), "https://cdn-a.example.com/img/b.png");
        assert_eq!(engine.rewrite("/img/b.png", "cdn-b.example.com"), "https://cdn-b.example.com/img/b.png");
        assert_eq!(engine.rewrite("/img/b.png", "cdn-a.example.com"), "https://cdn-a.example.com/img/b.png");
    }

    #[test]
    fn test_media_resolved_in_site_language() {
        let (mut item, public) = photo(4, true);
        item.language = "de".to_string();
        let content = FakeContent::with_items(vec![(item, public)]);
        let engine = rewriter(content.clone(), FakeFiles::default(), RewriteSettings::default());

        // Not present in the default language
        assert_eq!(engine.rewrite("/media/img/photo.ashx", CDN), "/media/img/photo.ashx");

        let german = engine.site_context(CDN, Some("de".to_string()));
        assert_eq!(
            engine.rewrite_for_site("/media/img/photo.ashx", &german),
            "https://cdn.example.com/media/img/photo.ashx?vs=4&d=20130101T000000"
        );
        assert_eq!(engine.site_context(CDN, None).language, "en");
        assert_eq!(content.resolve_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_request_classifiers() {
        let patterns = RewritePatterns {
            exclude_urls: PatternSet::compile(&["visitoridentification"]).unwrap(),
            process_requests: PatternSet::compile(&["^/"]).unwrap(),
            exclude_requests: PatternSet::compile(&["^/sitecore/"]).unwrap(),
        };
        let engine = CdnRewriter::new(
            RewriteSettings::default(),
            patterns,
            Arc::new(FakeContent::default()),
            Arc::new(FakeFiles::default()),
        );

        assert!(engine.is_url_excluded("/layouts/VisitorIdentification.js"));
        assert!(engine.is_request_eligible("/products/list"));
        assert!(!engine.is_request_eligible("/sitecore/login"));
        assert_eq!(engine.cache_stats().len(), 4);
    }
}
