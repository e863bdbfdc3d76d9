/*
 * Responsibility
 * - Single-host forwarder onto the configured upstream base URL
 * - Inject the upstream service credential as the `key` query parameter,
 *   overwriting any client-supplied value
 * - Collapse every transport failure into one 502 upstream_error
 */
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Uri, header};
use axum::response::{IntoResponse, Response};
use tracing::error;
use url::Url;

use crate::error::ApiError;

// Hop-by-hop headers are meaningful only on the client<->gateway leg.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Clone)]
pub struct UpstreamProxy {
    client: reqwest::Client,
    base: Url,
    service_secret: Option<String>,
    timeout: Duration,
}

// The service credential stays out of Debug output.
impl std::fmt::Debug for UpstreamProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamProxy")
            .field("base", &self.base.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl UpstreamProxy {
    pub fn new(base: Url, service_secret: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base,
            service_secret,
            timeout,
        }
    }

    /// Forward an admitted request and relay whatever the upstream says.
    /// The per-call timeout bounds the whole exchange; hitting it is a
    /// transport failure like any other.
    pub async fn forward(
        &self,
        method: Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Body,
    ) -> Response {
        let target = self.target_url(uri);

        let mut request = self
            .client
            .request(method, target.as_str())
            .timeout(self.timeout);
        for (name, value) in headers {
            if name == header::HOST || HOP_BY_HOP.contains(&name.as_str()) {
                continue;
            }
            request = request.header(name, value);
        }
        let request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));

        let upstream = match request.send().await {
            Ok(upstream) => upstream,
            Err(err) => {
                error!(error = %err, "upstream request failed");
                return ApiError::UpstreamError.into_response();
            }
        };

        let mut builder = Response::builder().status(upstream.status());
        for (name, value) in upstream.headers() {
            if HOP_BY_HOP.contains(&name.as_str()) {
                continue;
            }
            builder = builder.header(name, value);
        }
        match builder.body(Body::from_stream(upstream.bytes_stream())) {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, "failed to relay upstream response");
                ApiError::UpstreamError.into_response()
            }
        }
    }

    /// Rewrite the request target onto the upstream base. Path segments
    /// and the raw query pass through; only the `key` parameter is
    /// replaced when a service credential is configured.
    fn target_url(&self, uri: &Uri) -> Url {
        let mut target = self.base.clone();
        target.set_path(&joined_path(self.base.path(), uri.path()));
        target.set_query(uri.query());

        if let Some(secret) = &self.service_secret {
            let kept: Vec<(String, String)> = target
                .query_pairs()
                .filter(|(name, _)| name != "key")
                .map(|(name, value)| (name.into_owned(), value.into_owned()))
                .collect();
            let mut pairs = target.query_pairs_mut();
            pairs.clear();
            for (name, value) in &kept {
                pairs.append_pair(name, value);
            }
            pairs.append_pair("key", secret);
        }
        target
    }
}

fn joined_path(base: &str, request: &str) -> String {
    match (base.ends_with('/'), request.starts_with('/')) {
        (true, true) => format!("{}{}", base, &request[1..]),
        (false, false) => format!("{base}/{request}"),
        _ => format!("{base}{request}"),
    }
}
