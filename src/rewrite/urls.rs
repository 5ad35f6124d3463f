//! Url classification and manipulation helpers.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use url::{Position, Url};

use crate::rewrite::RewriteError;

/// Placeholder origin that relative urls are resolved against.
pub const ORIGIN_HOST: &str = "origin.invalid";

/// Prefixes that are never CDN-qualified (compared case-insensitively).
const NEVER_QUALIFIED: &[&str] = &["data:", "http", "//", "mail", "ftp:", "news:"];

/// Path segments Sitecore serves media handler urls under, ahead of the
/// media link prefix (`/~/media/...`, `/-/media/...`).
const MEDIA_HANDLER_SEGMENTS: &[&str] = &["/~", "/-"];

static FILE_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".+\.[A-Za-z0-9]{2,4}$").expect("static regex"));

/// Base url for resolving origin-relative references.
pub fn origin_base() -> Url {
    Url::parse(&format!("http://{}/", ORIGIN_HOST)).expect("static base url")
}

/// True for references that must be returned untouched: foreign or
/// protocol-relative urls, data/mail/ftp/news links and anything else that
/// carries its own scheme.
pub fn is_never_qualified(input: &str) -> bool {
    let trimmed = input.trim_start();
    NEVER_QUALIFIED.iter().any(|prefix| starts_with_ignore_case(trimmed, prefix)) || has_scheme(trimmed)
}

/// True when the url ends in `.` plus 2-4 alphanumerics, i.e. it looks like
/// an asset rather than a navigational route.
pub fn has_file_extension(href: &str) -> bool {
    FILE_EXTENSION.is_match(href)
}

/// Resolve an origin-relative reference: dot segments are collapsed and the
/// path gains a single leading `/`. Returns None when the result is not on
/// the origin (e.g. `\\host\share`).
pub fn normalize(base: &Url, input: &str) -> Result<Option<Url>, RewriteError> {
    let url = base.join(input.trim())?;
    if url.host_str() != Some(ORIGIN_HOST) || url.port().is_some() {
        return Ok(None);
    }
    Ok(Some(url))
}

/// Value of the first query parameter named `key` (case-insensitive).
pub fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.into_owned())
}

/// Presence check that ignores the parameter's value.
pub fn has_query_key(url: &Url, key: &str) -> bool {
    url.query_pairs().any(|(k, _)| k.eq_ignore_ascii_case(key))
}

/// Remove every occurrence of `key` from the query string.
pub fn remove_query_key(url: &mut Url, key: &str) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !k.eq_ignore_ascii_case(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

/// Set `key` to `value`, replacing any existing occurrences.
pub fn set_query_value(url: &mut Url, key: &str, value: &str) {
    if has_query_key(url, key) {
        remove_query_key(url, key);
    }
    url.query_pairs_mut().append_pair(key, value);
}

/// Point the url at `hostname`, which may carry a `:port` suffix.
pub fn apply_hostname(url: &mut Url, hostname: &str) -> Result<(), RewriteError> {
    let (host, port) = match hostname.rsplit_once(':') {
        Some((h, p)) if !h.is_empty() => match p.parse::<u16>() {
            Ok(port) => (h, Some(port)),
            Err(_) => (hostname, None),
        },
        _ => (hostname, None),
    };

    url.set_host(Some(host))
        .map_err(|e| RewriteError::InvalidHostname(format!("{}: {}", hostname, e)))?;
    url.set_port(port)
        .map_err(|_| RewriteError::InvalidHostname(hostname.to_string()))?;
    Ok(())
}

/// Force the https scheme.
pub fn force_https(url: &mut Url) -> Result<(), RewriteError> {
    url.set_scheme("https")
        .map_err(|_| RewriteError::InvalidHostname(format!("cannot switch {} to https", url)))
}

/// Serialize a url. Origin urls are emitted relative (path, query,
/// fragment); anything else is emitted absolute. A bare trailing `?` is
/// trimmed.
pub fn serialize(url: &Url) -> String {
    let text = if url.host_str() == Some(ORIGIN_HOST) {
        &url[Position::BeforePath..]
    } else {
        url.as_str()
    };
    text.trim_end_matches('?').to_string()
}

/// Compact ISO-8601 timestamp, e.g. `20130101T000000`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%S").to_string()
}

/// Byte offset just past `prefix` when `path` starts with it, directly or
/// behind a media handler segment. Case-insensitive.
pub fn media_prefix_end(path: &str, prefix: &str) -> Option<usize> {
    if starts_with_ignore_case(path, prefix) {
        return Some(prefix.len());
    }
    MEDIA_HANDLER_SEGMENTS
        .iter()
        .filter(|segment| path.starts_with(**segment))
        .find(|segment| starts_with_ignore_case(&path[segment.len()..], prefix))
        .map(|segment| segment.len() + prefix.len())
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// RFC 3986 scheme followed by `:` before any path, query or fragment.
fn has_scheme(text: &str) -> bool {
    let Some(colon) = text.find(':') else {
        return false;
    };
    let scheme = &text[..colon];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}
