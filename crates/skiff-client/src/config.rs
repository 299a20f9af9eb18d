use skiff_cid::DEFAULT_GATEWAY;
use std::time::Duration;

/// Storage client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Upload service base URL.
    pub service_url: String,
    /// Gateway host used when composing record URLs.
    pub gateway: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: "https://up.storacha.network".to_string(),
            gateway: DEFAULT_GATEWAY.to_string(),
        }
    }
}

/// Backend delegation-API configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Backend base URL (the `/api/...` surface).
    pub base_url: String,
    /// Total attempts per idempotent GET, including the first.
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt.
    pub initial_backoff: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3001".to_string(),
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
        }
    }
}
