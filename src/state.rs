/*
 * Responsibility
 * - Shared context handed to every request handler (Clone cheap, Arc inside)
 * - Owns the process-wide replay store and window limiter
 */
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::replay::ReplayStore;
use crate::services::auth::token::TokenService;
use crate::services::rate::WindowLimiter;
use crate::services::upstream::UpstreamProxy;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: Arc<TokenService>,
    pub replay: Arc<ReplayStore>,
    pub limiter: Arc<WindowLimiter>,
    pub upstream: UpstreamProxy,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let tokens = TokenService::new(&config.jwt_hmac_key, config.token_lifetime);
        let limiter = WindowLimiter::new(config.rate_limit_per_minute);
        let upstream = UpstreamProxy::new(
            config.upstream_base_url.clone(),
            config.upstream_service_secret.clone(),
            config.upstream_timeout,
        );

        Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            replay: Arc::new(ReplayStore::new()),
            limiter: Arc::new(limiter),
            upstream,
        }
    }
}
