//! Browser origin gate for the token-issue and proxy routes.
//!
//! Not a tower layer: the gate must run as the first pipeline stage
//! inside each handler and its CORS headers must land on every response
//! produced after it, including rejections.

use std::collections::HashSet;

use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::Response;

use crate::error::ApiError;

pub const ALLOW_HEADERS: &str = "Authorization, Content-Type, DPoP";
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";

/// Look up the `Origin` header in the allowlist. A hit yields the CORS
/// response headers to attach to whatever the route ends up returning;
/// a miss is terminal and gets no CORS headers at all.
pub fn check(headers: &HeaderMap, allowed: &HashSet<String>) -> Result<HeaderMap, ApiError> {
    let origin_value = headers.get(header::ORIGIN).cloned();
    let origin = origin_value
        .as_ref()
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if !allowed.contains(origin) {
        return Err(ApiError::OriginNotAllowed);
    }

    let mut cors = HeaderMap::new();
    if let Some(value) = origin_value {
        // echo the accepted origin verbatim, never a wildcard
        cors.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    cors.insert(header::VARY, HeaderValue::from_static("Origin"));
    cors.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    cors.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    Ok(cors)
}

pub fn apply(cors: HeaderMap, mut response: Response) -> Response {
    response.headers_mut().extend(cors);
    response
}

/// Header value as a str, empty when absent or non-UTF-8.
pub(crate) fn header_str<'a>(
    headers: &'a HeaderMap,
    name: impl header::AsHeaderName,
) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}
