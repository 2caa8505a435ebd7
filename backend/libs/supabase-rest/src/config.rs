/// Client configuration
///
/// Loads the project URL and anon key from environment variables.
use crate::error::{ClientError, ClientResult};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`
    pub url: String,
    /// Public anon key, sent as `apikey` on every request
    pub anon_key: String,
    /// Per-request timeout
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            timeout: default_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> ClientResult<Self> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| ClientError::Config("SUPABASE_URL not set".to_string()))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| ClientError::Config("SUPABASE_ANON_KEY not set".to_string()))?;

        if url.trim().is_empty() || anon_key.trim().is_empty() {
            return Err(ClientError::Config(
                "Missing backend environment variables".to_string(),
            ));
        }

        let timeout = std::env::var("SUPABASE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(default_timeout);

        Ok(Self::new(url, anon_key).with_timeout(timeout))
    }
}
