//! Media url generation hook.
//!
//! Called once per generated media link, independent of the HTML body pass.

use crate::content::MediaItem;
use crate::rewrite::{CdnRewriter, SiteContext, STOP_TOKEN};

/// Per-call override of the CDN behavior for generated media urls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CdnUrlSwitch {
    /// Replace when a CDN hostname is known.
    #[default]
    Default,
    /// Always replace.
    Enabled,
    /// Never replace; mark the url with the stop token.
    Disabled,
}

impl CdnRewriter {
    /// Finalize a generated media url for `item`.
    pub fn media_url(&self, item: &MediaItem, url: &str, cdn_hostname: &str, switch: CdnUrlSwitch) -> String {
        if switch == CdnUrlSwitch::Disabled {
            return with_stop_token(url);
        }

        let public = self.is_media_publicly_accessible(item).unwrap_or_else(|e| {
            tracing::error!(item = %item.id, error = %e, "IsMediaPubliclyAccessible failed");
            false
        });
        if !public || self.is_media_analytics_tracked(item) {
            return url.to_string();
        }

        let replace = match switch {
            CdnUrlSwitch::Enabled => true,
            _ => !cdn_hostname.is_empty(),
        };
        if replace {
            self.rewrite_for_site(url, &SiteContext::new(cdn_hostname, item.language.as_str()))
        } else {
            url.to_string()
        }
    }
}

/// Append `ncdn=1`, keeping any fragment last.
fn with_stop_token(url: &str) -> String {
    let (head, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };

    let already = head
        .split_once('?')
        .map(|(_, query)| {
            query
                .split('&')
                .any(|pair| pair.split('=').next().is_some_and(|k| k.eq_ignore_ascii_case(STOP_TOKEN)))
        })
        .unwrap_or(false);

    let mut out = head.to_string();
    if !already {
        out.push(if head.contains('?') { '&' } else { '?' });
        out.push_str(STOP_TOKEN);
        out.push_str("=1");
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}
