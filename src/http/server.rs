//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Forward requests to the origin
//! - Install the rewrite filter on eligible HTML responses
//! - Observability (metrics, correlation IDs)

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::content::{ConfiguredSites, ManifestContentStore, SiteResolver};
use crate::filter::rewrite_body;
use crate::http::intercept::{minify_target, MINIFY_PATH_HEADER};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::observability::metrics;
use crate::rewrite::{CdnRewriter, SiteContext};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub rewriter: Arc<CdnRewriter>,
    pub sites: Arc<ConfiguredSites>,
    pub content: Arc<ManifestContentStore>,
    pub client: Client<HttpConnector, Body>,
    pub config: Arc<ProxyConfig>,
    pub request_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(
        config: ProxyConfig,
        rewriter: Arc<CdnRewriter>,
        sites: Arc<ConfiguredSites>,
        content: Arc<ManifestContentStore>,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            rewriter,
            sites,
            content,
            client,
            config: Arc::new(config),
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// HTTP server for the rewrite proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let timeout = Duration::from_secs(state.config.timeouts.request_secs);
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(TimeoutLayer::new(timeout)),
            )
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward a request to the origin and rewrite the response if eligible.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let (mut parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers).to_string();
    let method = parts.method.clone();
    let host = request_host(&parts.headers, &parts.uri);
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let cdn = &state.config.cdn;
    let rewrite_for = if cdn.enabled {
        site_context(&state, &host).filter(|_| state.rewriter.is_request_eligible(&path_and_query))
    } else {
        None
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        host = %host,
        path = %path_and_query,
        rewrite = rewrite_for.is_some(),
        "Proxying request"
    );

    let mut upstream_path = path_and_query;
    if let Some(target) = minify_target(&parts.uri, cdn) {
        if let Ok(value) = HeaderValue::from_str(&target.original) {
            parts.headers.insert(MINIFY_PATH_HEADER, value);
        }
        tracing::debug!(request_id = %request_id, upstream = %target.upstream, "Routing to minify handler");
        upstream_path = target.upstream;
    }

    // The filter needs an uncompressed body.
    if rewrite_for.is_some() {
        parts.headers.remove(header::ACCEPT_ENCODING);
    }

    parts.uri = match format!("http://{}{}", state.config.origin.address, upstream_path).parse::<Uri>() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Invalid upstream uri");
            metrics::record_request(method.as_str(), 502, start_time);
            return (StatusCode::BAD_GATEWAY, "Invalid upstream uri").into_response();
        }
    };
    parts.version = Version::HTTP_11;

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(method.as_str(), status.as_u16(), start_time);

            let (mut parts, body) = response.into_parts();
            let body = Body::new(body);
            match rewrite_for {
                Some(site) if is_rewritable_html(&parts.headers) => {
                    parts.headers.remove(header::CONTENT_LENGTH);
                    tracing::debug!(
                        request_id = %request_id,
                        cdn_hostname = %site.cdn_hostname,
                        language = %site.language,
                        "Rewriting response body"
                    );
                    Response::from_parts(parts, rewrite_body(body, state.rewriter.clone(), site))
                }
                _ => Response::from_parts(parts, body),
            }
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_request(method.as_str(), 502, start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// Rewrite context of the site serving `host`; None when it has no CDN
/// hostname.
fn site_context(state: &AppState, host: &str) -> Option<SiteContext> {
    let cdn_hostname = state.sites.cdn_hostname_for(host)?;
    Some(state.rewriter.site_context(cdn_hostname, state.sites.language_for(host)))
}

/// Host the client asked for, from the Host header or an absolute uri.
fn request_host(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.host())
        .unwrap_or_default()
        .to_string()
}

/// Uncompressed `text/html`.
fn is_rewritable_html(headers: &HeaderMap) -> bool {
    let is_html = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start().to_ascii_lowercase().starts_with("text/html"))
        .unwrap_or(false);

    let encoded = headers
        .get(header::CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| !v.trim().eq_ignore_ascii_case("identity"))
        .unwrap_or(false);

    is_html && !encoded
}
