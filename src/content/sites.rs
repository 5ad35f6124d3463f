//! Site lookup by request host.

use std::collections::HashMap;

use crate::config::SiteConfig;
use crate::content::SiteResolver;

#[derive(Debug, Clone)]
struct SiteEntry {
    name: String,
    cdn_hostname: String,
    language: Option<String>,
}

/// Sites from configuration, indexed by lower-cased host name.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredSites {
    by_host: HashMap<String, SiteEntry>,
}

impl ConfiguredSites {
    pub fn from_config(sites: &[SiteConfig]) -> Self {
        let mut by_host = HashMap::new();
        for site in sites {
            let entry = SiteEntry {
                name: site.name.clone(),
                cdn_hostname: site.cdn_hostname.trim().to_string(),
                language: site.language.clone(),
            };
            for host in &site.hosts {
                let key = host.trim().to_ascii_lowercase();
                if by_host.insert(key.clone(), entry.clone()).is_some() {
                    tracing::warn!(host = %key, site = %site.name, "Host claimed by more than one site, last one wins");
                }
            }
        }
        Self { by_host }
    }

    /// Name of the site serving `host`.
    pub fn site_name(&self, host: &str) -> Option<&str> {
        self.lookup(host).map(|s| s.name.as_str())
    }

    fn lookup(&self, host: &str) -> Option<&SiteEntry> {
        self.by_host.get(&normalize_host(host))
    }
}

impl SiteResolver for ConfiguredSites {
    fn cdn_hostname_for(&self, host: &str) -> Option<String> {
        self.lookup(host)
            .map(|s| s.cdn_hostname.clone())
            .filter(|h| !h.is_empty())
    }

    fn language_for(&self, host: &str) -> Option<String> {
        self.lookup(host).and_then(|s| s.language.clone())
    }
}

/// Lower-case a Host header value and strip any port.
fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if host.starts_with('[') {
        // IPv6 literal, keep the brackets
        host.split_once("]:").map(|(h, _)| format!("{}]", h)).unwrap_or_else(|| host.to_string())
    } else {
        host.split(':').next().unwrap_or(host).to_string()
    };
    without_port.to_ascii_lowercase()
}
