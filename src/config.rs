use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_ANSWER_API_URL: &str = "https://api.perplexity.ai/chat/completions";
pub const DEFAULT_ANSWER_MODEL: &str = "sonar";

#[derive(Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    /// Credential for the answer service (chat-completions API).
    pub answer_api_key: String,
    pub answer_api_url: String,
    pub answer_model: String,
    /// Endpoint that resolves a caller bearer token to a user identity.
    pub identity_url: String,
    /// Endpoint implementing the atomic per-user usage counter.
    pub quota_url: String,
    /// Service credential for the identity and quota endpoints.
    pub service_key: String,
    /// Bound on a single upstream attempt.
    pub upstream_timeout: Duration,
    /// Retries after a timed-out attempt (cap, not total attempts).
    pub upstream_retries: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let answer_api_key = env::var("ANSWER_API_KEY")?;
        let identity_url = env::var("IDENTITY_URL")?;
        let quota_url = env::var("QUOTA_URL")?;
        let service_key = env::var("SERVICE_KEY")?;

        let answer_api_url = env::var("ANSWER_API_URL")
            .unwrap_or_else(|_| DEFAULT_ANSWER_API_URL.to_string());
        let answer_model = env::var("ANSWER_MODEL")
            .unwrap_or_else(|_| DEFAULT_ANSWER_MODEL.to_string());

        let timeout_secs: u64 = env_parse("UPSTREAM_TIMEOUT_SECS", 60)?;
        let upstream_retries: u32 = env_parse("UPSTREAM_RETRIES", 2)?;

        // Load server configuration with defaults
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env_parse("PORT", 3000)?;
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::Config(format!("Invalid host address: {}", e)))?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            answer_api_key,
            answer_api_url,
            answer_model,
            identity_url,
            quota_url,
            service_key,
            upstream_timeout: Duration::from_secs(timeout_secs),
            upstream_retries,
        })
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}
