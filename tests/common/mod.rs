//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use cdn_rewrite_proxy::admin::setup_admin_router;
use cdn_rewrite_proxy::config::{ProxyConfig, SiteConfig};
use cdn_rewrite_proxy::lifecycle::{build_state, Shutdown};
use cdn_rewrite_proxy::HttpServer;

/// What the mock origin answers.
pub struct OriginResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl OriginResponse {
    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.to_string(),
        }
    }

    pub fn with_type(content_type: &'static str, body: &str) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.to_string(),
        }
    }
}

/// Raw request heads seen by the mock origin.
pub type Recorded = Arc<Mutex<Vec<String>>>;

/// Start a programmable mock origin. The handler receives the request
/// target (path and query).
pub async fn start_origin<F>(handler: F) -> (SocketAddr, Recorded)
where
    F: Fn(&str) -> OriginResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let seen = recorded.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    let seen = seen.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let target = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();
                        seen.lock().unwrap().push(head);

                        let response = handler(&target);
                        let status_text = match response.status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };
                        let raw = format!(
                            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            response.content_type,
                            response.body.len(),
                            response.body
                        );
                        let _ = socket.write_all(raw.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, recorded)
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// Proxy config pointing at `origin`, with one site on 127.0.0.1.
pub fn site_config(origin: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.origin.address = origin.to_string();
    config.patterns.exclude_urls = vec!["visitoridentification".into()];
    config.patterns.process_requests = vec!["^/".into()];
    config.patterns.exclude_requests = vec!["^/sitecore/".into()];
    config.sites.push(SiteConfig {
        name: "website".into(),
        hosts: vec!["127.0.0.1".into()],
        cdn_hostname: "cdn.example.com".into(),
        language: None,
    });
    config
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = build_state(config).unwrap();
    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();

    tokio::spawn(async move {
        HttpServer::new(state).run(listener, stop).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

/// Start the admin API on an ephemeral port.
pub async fn start_admin(config: ProxyConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = setup_admin_router(build_state(config).unwrap());

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}
