/*
 * Responsibility
 * - GET|POST /api and subpaths: the admission state machine in front of
 *   the upstream forwarder
 *
 * The stage order is load-bearing. Rate limiting runs before any token
 * work so unauthenticated floods cannot buy CPU; the replay mark runs
 * strictly last so a failed proof can never burn a victim's jti.
 */
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, OriginalUri, State};
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::error::ApiError;
use crate::middleware::origin::{self, header_str};
use crate::services::auth::dpop::{
    ALLOWED_CLOCK_SKEW_SECS, DpopHeader, DpopPayload, REPLAY_WINDOW_SECS, verify_es256,
};
use crate::services::auth::jwk;
use crate::services::auth::jws::{self, CompactJws};
use crate::services::rate;
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";
const DPOP_HEADER: &str = "dpop";
const FORWARDED_PROTO_HEADER: &str = "x-forwarded-proto";

pub async fn protected_proxy(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    OriginalUri(uri): OriginalUri,
    request: Request<Body>,
) -> Response {
    let cors = match origin::check(request.headers(), &state.config.allowed_origins) {
        Ok(cors) => cors,
        Err(err) => return err.into_response(),
    };
    if request.method() == Method::OPTIONS {
        return origin::apply(cors, StatusCode::NO_CONTENT.into_response());
    }

    let response = match admit(&state, remote, &uri, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    };
    origin::apply(cors, response)
}

async fn admit(
    state: &AppState,
    remote: SocketAddr,
    uri: &Uri,
    request: Request<Body>,
) -> Result<Response, ApiError> {
    let method = request.method().clone();
    if method != Method::GET && method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    let headers = request.headers();
    let origin_header = header_str(headers, header::ORIGIN);
    let bucket = rate::bucket_key(origin_header, &remote.ip().to_string());
    if !state.limiter.allow(&bucket) {
        return Err(ApiError::RateLimited);
    }

    let bearer = parse_bearer(header_str(headers, header::AUTHORIZATION))
        .ok_or(ApiError::MissingBearer)?;
    let claims = state.tokens.verify(bearer)?;

    let now = Utc::now().timestamp();
    claims.validate(now)?;
    let token_exp = claims.exp.ok_or(ApiError::BadClaims)?;

    let raw_proof = header_str(headers, DPOP_HEADER).trim();
    if raw_proof.is_empty() {
        return Err(ApiError::MissingDpop);
    }

    let proof: CompactJws<DpopHeader, DpopPayload> =
        jws::parse(raw_proof).map_err(|_| ApiError::BadDpop)?;
    if !proof.header.is_wellformed() {
        return Err(ApiError::BadDpopHeader);
    }

    let proof_key = jwk::verifying_key(&proof.header.jwk).map_err(|_| ApiError::BadDpopKey)?;
    if !verify_es256(&proof.signing_input, &proof.signature, &proof_key) {
        return Err(ApiError::BadDpopSig);
    }

    let proof_thumbprint =
        jwk::thumbprint(&proof.header.jwk).map_err(|_| ApiError::CnfMismatch)?;
    if proof_thumbprint != claims.cnf.jkt {
        return Err(ApiError::CnfMismatch);
    }

    if proof.payload.htm != method.as_str() {
        return Err(ApiError::HtmMismatch);
    }
    if proof.payload.htu != expected_htu(headers, uri) {
        return Err(ApiError::HtuMismatch);
    }

    if proof.payload.jti.is_empty() {
        return Err(ApiError::MissingDpopJti);
    }
    if proof.payload.iat == 0 {
        return Err(ApiError::MissingDpopIat);
    }

    let now = Utc::now().timestamp();
    if proof.payload.iat > now + ALLOWED_CLOCK_SKEW_SECS {
        return Err(ApiError::DpopIatInFuture);
    }
    if proof.payload.iat < now - REPLAY_WINDOW_SECS {
        return Err(ApiError::DpopIatTooOld);
    }

    // Single-use marking happens only after every other check has passed;
    // a rejected proof must leave the jti unburned.
    let replay_expires = (proof.payload.iat + REPLAY_WINDOW_SECS).min(token_exp);
    if !state.replay.mark(&proof.payload.jti, replay_expires) {
        return Err(ApiError::Replay);
    }

    let (parts, body) = request.into_parts();
    Ok(state
        .upstream
        .forward(parts.method, uri, &parts.headers, body)
        .await)
}

/// Token after the exact `Bearer ` prefix, trimmed. The prefix match is
/// case-sensitive.
fn parse_bearer(authorization: &str) -> Option<&str> {
    let token = authorization.strip_prefix(BEARER_PREFIX)?.trim();
    (!token.is_empty()).then_some(token)
}

/// Reconstruct the URL a well-behaved client signed over.
///
/// Built from the raw request fields — Host header verbatim, path and
/// query exactly as they appeared on the request line. Normalizing the
/// path here would break byte-equality against honest proofs.
fn expected_htu(headers: &HeaderMap, uri: &Uri) -> String {
    let proto = header_str(headers, FORWARDED_PROTO_HEADER).trim().to_ascii_lowercase();
    let scheme = if proto == "https" { "https" } else { "http" };
    let host = header_str(headers, header::HOST);

    let mut target = String::from(uri.path());
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }
    format!("{scheme}://{host}{target}")
}
