//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cdn_proxy_requests_total` (counter): requests by method, status
//! - `cdn_proxy_request_duration_seconds` (histogram): latency distribution
//! - `cdn_rewrite_total` (counter): URL rewrites by outcome
//! - `cdn_cache_lookups_total` (counter): cache lookups by cache, result
//! - `cdn_cache_evictions_total` (counter): evicted entries by cache
//! - `cdn_document_rewrite_seconds` (histogram): document pass duration
//! - `cdn_document_attributes_rewritten_total` (counter)
//! - `cdn_filter_fallback_total` (counter): verbatim flushes by reason

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics recorder"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "cdn_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("cdn_proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rewrite(outcome: &'static str) {
    ::metrics::counter!("cdn_rewrite_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_lookup(cache: &str, hit: bool) {
    ::metrics::counter!(
        "cdn_cache_lookups_total",
        "cache" => cache.to_string(),
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

pub fn record_cache_eviction(cache: &str, count: u64) {
    ::metrics::counter!("cdn_cache_evictions_total", "cache" => cache.to_string()).increment(count);
}

pub fn record_document_pass(elapsed: Duration, rewritten: usize) {
    ::metrics::histogram!("cdn_document_rewrite_seconds").record(elapsed.as_secs_f64());
    ::metrics::counter!("cdn_document_attributes_rewritten_total").increment(rewritten as u64);
}

pub fn record_filter_fallback(reason: &'static str) {
    ::metrics::counter!("cdn_filter_fallback_total", "reason" => reason).increment(1);
}
