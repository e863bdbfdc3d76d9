/*
 * Responsibility
 * - Route table: exact /tvm/issue, prefix /api, /health, /sdk assets
 *
 * The issue and proxy routes register with `any()` because origin and
 * method gating happen inside the handlers — rejections need the JSON
 * error body and, after an allowlist hit, the CORS headers.
 */
use axum::{
    Router,
    routing::{any, get},
};

use crate::api::handlers::{health, issue, proxy, sdk};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/tvm/issue", any(issue::token_issue))
        .route("/api", any(proxy::protected_proxy))
        .route("/api/{*path}", any(proxy::protected_proxy))
        .route("/health", get(health::health))
        .route("/sdk/{*asset}", get(sdk::serve_asset))
        .with_state(state)
}
