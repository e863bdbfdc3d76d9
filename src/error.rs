/*
 * Responsibility
 * - Gateway-wide ApiError with the protocol's opaque error codes
 * - IntoResponse impl (HTTP status / {"error":"<code>"} JSON body)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Client-visible rejection. The opaque code is the entire contract; the
/// status and code pairing must stay stable because clients key on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    OriginNotAllowed,
    MethodNotAllowed,
    BadRequestBody,
    InvalidJson,
    UnsupportedJwk,
    BadJwkThumbprint,
    SignError,
    RateLimited,
    MissingBearer,
    InvalidToken,
    BadClaims,
    MissingDpop,
    BadDpop,
    BadDpopHeader,
    BadDpopKey,
    BadDpopSig,
    CnfMismatch,
    HtmMismatch,
    HtuMismatch,
    MissingDpopJti,
    MissingDpopIat,
    DpopIatInFuture,
    DpopIatTooOld,
    Replay,
    UpstreamError,
}

impl ApiError {
    pub fn code(self) -> &'static str {
        match self {
            Self::OriginNotAllowed => "origin_not_allowed",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::BadRequestBody => "bad_request_body",
            Self::InvalidJson => "invalid_json",
            Self::UnsupportedJwk => "unsupported_jwk",
            Self::BadJwkThumbprint => "bad_jwk_thumbprint",
            Self::SignError => "sign_error",
            Self::RateLimited => "rate_limited",
            Self::MissingBearer => "missing_bearer",
            Self::InvalidToken => "invalid_token",
            Self::BadClaims => "bad_claims",
            Self::MissingDpop => "missing_dpop",
            Self::BadDpop => "bad_dpop",
            Self::BadDpopHeader => "bad_dpop_header",
            Self::BadDpopKey => "bad_dpop_key",
            Self::BadDpopSig => "bad_dpop_sig",
            Self::CnfMismatch => "cnf_mismatch",
            Self::HtmMismatch => "htm_mismatch",
            Self::HtuMismatch => "htu_mismatch",
            Self::MissingDpopJti => "missing_dpop_jti",
            Self::MissingDpopIat => "missing_dpop_iat",
            Self::DpopIatInFuture => "dpop_iat_in_future",
            Self::DpopIatTooOld => "dpop_iat_too_old",
            Self::Replay => "replay",
            Self::UpstreamError => "upstream_error",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Self::OriginNotAllowed => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::BadRequestBody
            | Self::InvalidJson
            | Self::UnsupportedJwk
            | Self::BadJwkThumbprint => StatusCode::BAD_REQUEST,
            Self::SignError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.code() }))).into_response()
    }
}
