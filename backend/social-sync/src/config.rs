/// Configuration management for social-sync
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use std::time::Duration;
use supabase_rest::ClientConfig;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Backend connection
    pub backend: ClientConfig,
    /// Synchronizer behaviour
    pub sync: SyncConfig,
    /// Optional credentials the binary signs in with
    pub credentials: Option<Credentials>,
}

/// Application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }
}

/// Synchronizer settings
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Reverse the relation write when the counter adjustment after it fails
    pub rollback_on_counter_failure: bool,
    /// Age after which the local post replica is considered stale
    pub posts_max_age: Duration,
    /// How often the background refresher checks for staleness
    pub refresh_interval: Duration,
    /// Emails that get the admin role on sign-up
    pub admin_emails: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rollback_on_counter_failure: true,
            posts_max_age: Duration::from_secs(default_posts_max_age_secs()),
            refresh_interval: Duration::from_secs(default_refresh_interval_secs()),
            admin_emails: Vec::new(),
        }
    }
}

impl SyncConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// Default values
fn default_posts_max_age_secs() -> u64 {
    300
}

fn default_refresh_interval_secs() -> u64 {
    60
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        };

        let backend = ClientConfig::from_env().context("Failed to load backend configuration")?;

        let sync = SyncConfig {
            rollback_on_counter_failure: std::env::var("SYNC_ROLLBACK_ON_COUNTER_FAILURE")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(true),
            posts_max_age: Duration::from_secs(
                std::env::var("SYNC_POSTS_MAX_AGE_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_posts_max_age_secs),
            ),
            refresh_interval: Duration::from_secs(
                std::env::var("SYNC_REFRESH_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or_else(default_refresh_interval_secs),
            ),
            admin_emails: std::env::var("ADMIN_EMAILS")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|e| !e.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        let credentials = match (
            std::env::var("SYNC_USER_EMAIL"),
            std::env::var("SYNC_USER_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) if !email.is_empty() => Some(Credentials { email, password }),
            _ => None,
        };

        Ok(Config {
            app,
            backend,
            sync,
            credentials,
        })
    }
}
