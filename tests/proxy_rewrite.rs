//! End-to-end tests: client → proxy → mock origin.

use axum::http::StatusCode;
use std::io::Write;

mod common;

use common::{site_config, start_origin, start_proxy, OriginResponse};

const PAGE: &str = r#"<html><head><link rel="stylesheet" href="/styles/site.css"></head><body><a href="/about">About</a><img src="/img/a.png"><script src="/layouts/VisitorIdentification.js"></script></body></html>"#;

#[tokio::test]
async fn test_html_response_rewritten() {
    let (origin, recorded) = start_origin(|_| OriginResponse::html(PAGE)).await;
    let (proxy, shutdown) = start_proxy(site_config(origin)).await;

    let res = reqwest::Client::new()
        .get(format!("http://{}/products", proxy))
        .header("accept-encoding", "gzip")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-request-id").is_some());
    let body = res.text().await.unwrap();

    assert!(body.contains(r#"href="https://cdn.example.com/styles/site.css""#));
    assert!(body.contains(r#"src="https://cdn.example.com/img/a.png""#));
    assert!(body.contains(r#"href="/about""#));
    assert!(body.contains(r#"src="/layouts/VisitorIdentification.js""#));

    let heads = recorded.lock().unwrap();
    let head = heads[0].to_ascii_lowercase();
    assert!(!head.contains("accept-encoding"));
    assert!(head.contains("x-request-id"));
    drop(heads);

    shutdown.trigger();
}

#[tokio::test]
async fn test_non_html_passes_through() {
    let css = "body { background: url(/img/a.png); }";
    let (origin, _) = start_origin(move |_| OriginResponse::with_type("text/css", css)).await;
    let (proxy, shutdown) = start_proxy(site_config(origin)).await;

    let body = reqwest::get(format!("http://{}/styles/site.css", proxy))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, css);

    shutdown.trigger();
}

#[tokio::test]
async fn test_excluded_request_not_rewritten() {
    let (origin, _) = start_origin(|_| OriginResponse::html(PAGE)).await;
    let (proxy, shutdown) = start_proxy(site_config(origin)).await;

    let body = reqwest::get(format!("http://{}/sitecore/login", proxy))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, PAGE);

    shutdown.trigger();
}

#[tokio::test]
async fn test_site_without_cdn_hostname_not_rewritten() {
    let (origin, _) = start_origin(|_| OriginResponse::html(PAGE)).await;
    let (proxy, shutdown) = start_proxy(site_config(origin)).await;

    let body = reqwest::get(format!("http://localhost:{}/products", proxy.port()))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, PAGE);

    shutdown.trigger();
}

#[tokio::test]
async fn test_cdn_disabled_not_rewritten() {
    let (origin, _) = start_origin(|_| OriginResponse::html(PAGE)).await;
    let mut config = site_config(origin);
    config.cdn.enabled = false;
    let (proxy, shutdown) = start_proxy(config).await;

    let body = reqwest::get(format!("http://{}/products", proxy))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, PAGE);

    shutdown.trigger();
}

#[tokio::test]
async fn test_media_versioned_from_manifest() {
    let mut manifest = tempfile::NamedTempFile::new().unwrap();
    write!(
        manifest,
        r#"{{ "items": [ {{
            "id": "{{PHOTO}}",
            "path": "/sitecore/media library/img/photo",
            "versions": [ {{ "number": 3, "updated": "2013-01-01T00:00:00Z" }} ]
        }} ] }}"#
    )
    .unwrap();

    let page = r#"<html><body><img src="/~/media/img/photo.ashx"><img src="/~/media/img/unknown.ashx"></body></html>"#;
    let (origin, _) = start_origin(move |_| OriginResponse::html(page)).await;
    let mut config = site_config(origin);
    config.content.manifest_path = Some(manifest.path().to_string_lossy().into_owned());
    let (proxy, shutdown) = start_proxy(config).await;

    let body = reqwest::get(format!("http://{}/gallery", proxy))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(r#"src="https://cdn.example.com/~/media/img/photo.ashx?vs=3&amp;d=20130101T000000""#));
    assert!(body.contains(r#"src="/~/media/img/unknown.ashx""#));

    shutdown.trigger();
}

#[tokio::test]
async fn test_media_resolved_in_site_language() {
    let mut manifest = tempfile::NamedTempFile::new().unwrap();
    write!(
        manifest,
        r#"{{ "items": [ {{
            "id": "{{PHOTO}}",
            "path": "/sitecore/media library/img/photo",
            "language": "de",
            "versions": [ {{ "number": 2, "updated": "2014-06-01T12:00:00Z" }} ]
        }} ] }}"#
    )
    .unwrap();

    let page = r#"<html><body><img src="/~/media/img/photo.ashx"></body></html>"#;
    let (origin, _) = start_origin(move |_| OriginResponse::html(page)).await;
    let mut config = site_config(origin);
    config.content.manifest_path = Some(manifest.path().to_string_lossy().into_owned());
    config.sites[0].language = Some("de".into());
    let (proxy, shutdown) = start_proxy(config).await;

    let body = reqwest::get(format!("http://{}/galerie", proxy))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(r#"src="https://cdn.example.com/~/media/img/photo.ashx?vs=2&amp;d=20140601T120000""#));

    shutdown.trigger();
}

#[tokio::test]
async fn test_template_contents_preserved() {
    let page = r#"<html><body><template id="row"><tr><td><img src="/img/a.png">Name</td></tr></template></body></html>"#;
    let (origin, _) = start_origin(move |_| OriginResponse::html(page)).await;
    let (proxy, shutdown) = start_proxy(site_config(origin)).await;

    let body = reqwest::get(format!("http://{}/list", proxy))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.contains(
        r#"<template id="row"><tr><td><img src="https://cdn.example.com/img/a.png">Name</td></tr></template>"#
    ));

    shutdown.trigger();
}

#[tokio::test]
async fn test_minify_requests_routed_to_handler() {
    let (origin, recorded) = start_origin(|_| OriginResponse::with_type("text/css", "a{}")).await;
    let mut config = site_config(origin);
    config.cdn.minify_enabled = true;
    let (proxy, shutdown) = start_proxy(config).await;

    let res = reqwest::get(format!("http://{}/styles/site.css?min=1", proxy)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let heads = recorded.lock().unwrap();
    assert!(heads[0].starts_with("GET /~/minify/styles/site.css?min=1 HTTP/1.1"));
    assert!(heads[0].to_ascii_lowercase().contains("x-minify-path: /styles/site.css?min=1"));
    drop(heads);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_origin_returns_502() {
    // Grab a free port, then release it so nothing listens there.
    let unused = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (proxy, shutdown) = start_proxy(site_config(unused)).await;

    let res = reqwest::get(format!("http://{}/products", proxy)).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    shutdown.trigger();
}
