/*
 * Responsibility
 * - GET /sdk/ (wildcard): embedded browser client assets (read-only byte blobs,
 *   no filesystem access at runtime)
 */
use axum::extract::Path;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

const GATEWAY_MJS: &str = include_str!("../../../sdk/gateway.mjs");

pub async fn serve_asset(Path(asset): Path<String>) -> Response {
    match asset.as_str() {
        "gateway.mjs" => (
            [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
            GATEWAY_MJS,
        )
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
