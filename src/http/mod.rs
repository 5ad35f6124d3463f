//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tracing, timeout)
//!     → request.rs (assign/propagate request ID)
//!     → intercept.rs (minify handler redirect)
//!     → origin (hyper-util client)
//!     → filter::rewrite_body for eligible HTML responses
//!     → Send to client
//! ```

pub mod intercept;
pub mod request;
pub mod server;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
