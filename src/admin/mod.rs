//! Admin API.
//!
//! Diagnostics for the rewrite engine: status, cache statistics, a dry-run
//! rewrite endpoint and media manifest reload. Bound on its own listener and
//! protected by a bearer token.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/cache", get(get_cache))
        .route("/admin/rewrite", post(post_rewrite))
        .route("/admin/content/reload", post(post_reload))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
