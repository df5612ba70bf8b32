pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod prompt;
pub mod quota;
pub mod upstream;

use std::sync::Arc;

use cache::ResultCache;
use config::Config;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<ResultCache>,
    /// Shared connection pool for every outbound call (answer service,
    /// identity, quota counter).
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        AppState {
            config: Arc::new(config),
            cache: Arc::new(ResultCache::new()),
            http: reqwest::Client::new(),
        }
    }
}
