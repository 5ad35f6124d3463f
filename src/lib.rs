//! CDN rewrite proxy library.

pub mod admin;
pub mod cache;
pub mod config;
pub mod content;
pub mod filter;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rewrite::CdnRewriter;
