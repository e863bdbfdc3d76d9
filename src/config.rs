/*
 * Responsibility
 * - Environment-driven gateway configuration, validated at startup
 * - Missing or invalid required values are terminal errors
 */
use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

pub const ENV_LISTEN_ADDR: &str = "LISTEN_ADDR";
pub const ENV_ORIGIN_ALLOWLIST: &str = "ORIGIN_ALLOWLIST";
pub const ENV_REQUIRE_CHALLENGE: &str = "REQUIRE_CHALLENGE";
pub const ENV_CHALLENGE_SECRET: &str = "CHALLENGE_SECRET_KEY";
pub const ENV_TOKEN_LIFETIME_SECONDS: &str = "TOKEN_LIFETIME_SECONDS";
pub const ENV_JWT_HS256_KEY: &str = "GATEWAY_JWT_HS256_KEY";
pub const ENV_UPSTREAM_BASE_URL: &str = "UPSTREAM_BASE_URL";
pub const ENV_UPSTREAM_SERVICE_SECRET: &str = "UPSTREAM_SERVICE_SECRET";
pub const ENV_RATE_LIMIT_PER_MINUTE: &str = "RATE_LIMIT_PER_MINUTE";
pub const ENV_UPSTREAM_TIMEOUT_SECONDS: &str = "UPSTREAM_TIMEOUT_SECONDS";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_LIFETIME_SECONDS: u64 = 300;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;
const DEFAULT_UPSTREAM_TIMEOUT_SECONDS: u64 = 40;

const MIN_HMAC_KEY_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub allowed_origins: HashSet<String>,
    pub require_challenge: bool,
    pub challenge_secret: String,
    pub token_lifetime: Duration,
    pub jwt_hmac_key: Vec<u8>,
    pub upstream_base_url: Url,
    pub upstream_service_secret: Option<String>,
    pub rate_limit_per_minute: u32,
    pub upstream_timeout: Duration,
}

// Secrets stay out of Debug output.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("allowed_origins", &self.allowed_origins)
            .field("require_challenge", &self.require_challenge)
            .field("token_lifetime", &self.token_lifetime)
            .field("upstream_base_url", &self.upstream_base_url.as_str())
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("upstream_timeout", &self.upstream_timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup. Split out of [`Config::from_env`] so tests
    /// do not have to mutate process-global environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let allowlist_raw = trimmed(&lookup, ENV_ORIGIN_ALLOWLIST);
        if allowlist_raw.is_empty() {
            return Err(ConfigError::Missing(ENV_ORIGIN_ALLOWLIST));
        }
        let allowed_origins: HashSet<String> = allowlist_raw
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let listen_raw = lookup(ENV_LISTEN_ADDR).unwrap_or_default();
        let listen_raw = if listen_raw.is_empty() {
            DEFAULT_LISTEN_ADDR.to_string()
        } else if listen_raw.starts_with(':') {
            // accept the bare ":8080" shorthand
            format!("0.0.0.0{listen_raw}")
        } else {
            listen_raw
        };
        let listen_addr: SocketAddr = listen_raw
            .parse()
            .map_err(|_| ConfigError::Invalid(ENV_LISTEN_ADDR))?;

        let token_lifetime_secs =
            positive_or(&lookup, ENV_TOKEN_LIFETIME_SECONDS, DEFAULT_TOKEN_LIFETIME_SECONDS);
        let rate_limit_per_minute = u32::try_from(positive_or(
            &lookup,
            ENV_RATE_LIMIT_PER_MINUTE,
            u64::from(DEFAULT_RATE_LIMIT_PER_MINUTE),
        ))
        .unwrap_or(DEFAULT_RATE_LIMIT_PER_MINUTE);
        let upstream_timeout_secs = positive_or(
            &lookup,
            ENV_UPSTREAM_TIMEOUT_SECONDS,
            DEFAULT_UPSTREAM_TIMEOUT_SECONDS,
        );

        let jwt_hmac_key = trimmed(&lookup, ENV_JWT_HS256_KEY);
        if jwt_hmac_key.len() < MIN_HMAC_KEY_BYTES {
            // weak or missing: both are terminal
            return Err(ConfigError::Invalid(ENV_JWT_HS256_KEY));
        }

        let upstream_raw = trimmed(&lookup, ENV_UPSTREAM_BASE_URL);
        if upstream_raw.is_empty() {
            return Err(ConfigError::Missing(ENV_UPSTREAM_BASE_URL));
        }
        let upstream_base_url =
            Url::parse(&upstream_raw).map_err(|_| ConfigError::Invalid(ENV_UPSTREAM_BASE_URL))?;

        let require_challenge =
            trimmed(&lookup, ENV_REQUIRE_CHALLENGE).eq_ignore_ascii_case("true");
        let challenge_secret = trimmed(&lookup, ENV_CHALLENGE_SECRET);
        if require_challenge && challenge_secret.is_empty() {
            return Err(ConfigError::Missing(ENV_CHALLENGE_SECRET));
        }

        let upstream_service_secret =
            Some(trimmed(&lookup, ENV_UPSTREAM_SERVICE_SECRET)).filter(|s| !s.is_empty());

        Ok(Config {
            listen_addr,
            allowed_origins,
            require_challenge,
            challenge_secret,
            token_lifetime: Duration::from_secs(token_lifetime_secs),
            jwt_hmac_key: jwt_hmac_key.into_bytes(),
            upstream_base_url,
            upstream_service_secret,
            rate_limit_per_minute,
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
        })
    }
}

fn trimmed(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> String {
    lookup(key).unwrap_or_default().trim().to_string()
}

// Parse a positive integer; anything else keeps the default.
fn positive_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match trimmed(lookup, key).parse::<u64>() {
        Ok(value) if value > 0 => value,
        _ => default,
    }
}
