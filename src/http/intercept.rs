//! Minify handler redirect.
//!
//! Requests for `.css`/`.js` files carrying `min=1` are sent to the origin's
//! minify handler at `/~/minify<path>`; the original path and query travel
//! in the `x-minify-path` header.

use axum::http::Uri;

use crate::config::CdnConfig;
use crate::rewrite::urls::media_prefix_end;

/// Header carrying the original path and query to the minify handler.
pub const MINIFY_PATH_HEADER: &str = "x-minify-path";

/// Origin path prefix of the minify handler.
pub const MINIFY_HANDLER_PREFIX: &str = "/~/minify";

/// Where a minify request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifyTarget {
    /// Path and query to request from the origin.
    pub upstream: String,
    /// Original path and query.
    pub original: String,
}

/// Returns the minify target for `uri`, if the request qualifies.
pub fn minify_target(uri: &Uri, cdn: &CdnConfig) -> Option<MinifyTarget> {
    if !cdn.enabled || !cdn.minify_enabled {
        return None;
    }

    let query = uri.query()?;
    let wants_minified = url::form_urlencoded::parse(query.as_bytes())
        .any(|(k, v)| k.eq_ignore_ascii_case("min") && v == "1");
    if !wants_minified {
        return None;
    }

    let path = uri.path();
    let lower = path.to_ascii_lowercase();
    if media_prefix_end(path, &cdn.media_link_prefix).is_some() {
        return None;
    }
    if !(lower.ends_with(".css") || lower.ends_with(".js")) {
        return None;
    }

    Some(MinifyTarget {
        upstream: format!("{}{}?{}", MINIFY_HANDLER_PREFIX, path, query),
        original: format!("{}?{}", path, query),
    })
}
