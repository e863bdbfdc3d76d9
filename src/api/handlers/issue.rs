/*
 * Responsibility
 * - POST /tvm/issue: accept a client P-256 JWK, mint a bearer bound to
 *   its thumbprint
 */
use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::middleware::origin;
use crate::services::auth::jwk::{self, PublicJwk};
use crate::state::AppState;

// A JWK body is a few hundred bytes; anything near this limit is abuse.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct TokenIssueRequest {
    #[serde(default, rename = "dpopPublicJwk")]
    pub dpop_public_jwk: PublicJwk,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenIssueResponse {
    pub access_token: String,
    pub expires_in: u64,
}

pub async fn token_issue(State(state): State<AppState>, request: Request<Body>) -> Response {
    let cors = match origin::check(request.headers(), &state.config.allowed_origins) {
        Ok(cors) => cors,
        Err(err) => return err.into_response(),
    };
    if request.method() == Method::OPTIONS {
        return origin::apply(cors, StatusCode::NO_CONTENT.into_response());
    }

    let response = match issue(&state, request).await {
        Ok(body) => body.into_response(),
        Err(err) => err.into_response(),
    };
    origin::apply(cors, response)
}

async fn issue(
    state: &AppState,
    request: Request<Body>,
) -> Result<Json<TokenIssueResponse>, ApiError> {
    if request.method() != Method::POST && request.method() != Method::GET {
        return Err(ApiError::MethodNotAllowed);
    }

    let body = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|_| ApiError::BadRequestBody)?;
    let issue_request: TokenIssueRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::InvalidJson)?;

    let jwk = issue_request.dpop_public_jwk;
    if !jwk.is_p256() {
        return Err(ApiError::UnsupportedJwk);
    }
    let thumbprint = jwk::thumbprint(&jwk).map_err(|_| ApiError::BadJwkThumbprint)?;

    let access_token = state.tokens.issue(thumbprint)?;
    Ok(Json(TokenIssueResponse {
        access_token,
        expires_in: state.tokens.lifetime_secs(),
    }))
}
