//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Compile every configured pattern once so bad regexes fail at startup
//! - Validate value ranges (cache size > 0, timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::cache::parse_size;
use crate::config::schema::ProxyConfig;
use crate::rewrite::classifier::PatternSet;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("cdn.cache_size: {0}")]
    CacheSize(String),

    #[error("patterns.{list}[{index}]: {message}")]
    Pattern { list: &'static str, index: usize, message: String },

    #[error("{field}: invalid socket address '{value}'")]
    Address { field: &'static str, value: String },

    #[error("origin.address must not be empty")]
    EmptyOrigin,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("sites.{site}: cdn_hostname '{hostname}' must be a bare host name")]
    CdnHostname { site: String, hostname: String },

    #[error("sites.{0}: at least one host is required")]
    NoHosts(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match parse_size(&config.cdn.cache_size) {
        Ok(0) => errors.push(ValidationError::CacheSize("must be greater than zero".into())),
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::CacheSize(e.to_string())),
    }

    let lists = [
        ("exclude_urls", &config.patterns.exclude_urls),
        ("process_requests", &config.patterns.process_requests),
        ("exclude_requests", &config.patterns.exclude_requests),
    ];
    for (list, patterns) in lists {
        for (index, pattern) in patterns.iter().enumerate() {
            if let Err(e) = PatternSet::compile_one(pattern) {
                errors.push(ValidationError::Pattern { list, index, message: e.to_string() });
            }
        }
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if config.origin.address.trim().is_empty() {
        errors.push(ValidationError::EmptyOrigin);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    for site in &config.sites {
        if site.hosts.is_empty() {
            errors.push(ValidationError::NoHosts(site.name.clone()));
        }
        let hostname = site.cdn_hostname.trim();
        if hostname.contains("://") || hostname.contains('/') || hostname.contains('?') {
            errors.push(ValidationError::CdnHostname {
                site: site.name.clone(),
                hostname: site.cdn_hostname.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address { field, value: value.to_string() });
    }
}
