//! Typed async binding to the hosted backend
//!
//! Covers the four HTTP surfaces the application talks to:
//! - rows (`/rest/v1/{table}`) through [`QueryBuilder`]
//! - named server-side functions (`/rest/v1/rpc/{name}`)
//! - password auth (`/auth/v1/*`)
//! - object storage (`/storage/v1/object/*`)

pub mod auth;
pub mod config;
pub mod error;
pub mod query;
pub mod storage;

pub use auth::{AuthUser, Session};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use query::QueryBuilder;

use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Shared backend client
///
/// Cheap to clone; clones share the HTTP connection pool and the session.
#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    config: ClientConfig,
    session: Arc<RwLock<Option<Session>>>,
}

impl SupabaseClient {
    /// Create a new client from configuration
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            config,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Create a new client with configuration from environment
    pub fn from_env() -> ClientResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a query against a table
    pub fn from(&self, table: &str) -> QueryBuilder<'_> {
        QueryBuilder::new(self, table)
    }

    /// Invoke a named server-side function, discarding its result
    pub async fn rpc<A: Serialize + ?Sized>(&self, function: &str, args: &A) -> ClientResult<()> {
        let url = format!("{}/rest/v1/rpc/{}", self.config.url, function);
        debug!(function = %function, "rpc call");

        let response = self.authorized(self.http.post(&url)).await.json(args).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Current session, if signed in
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Install a session obtained elsewhere (e.g. restored from disk)
    pub async fn set_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Attach the `apikey` header and the bearer token.
    ///
    /// The bearer is the session access token when signed in, else the anon key.
    pub(crate) async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.config.anon_key.clone(),
        };

        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }
}

/// Turn a non-2xx response into [`ClientError::Api`]
pub(crate) async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status: status.as_u16(),
        message: extract_message(&body),
    })
}

/// Decode a successful JSON body
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Pick the human-readable message out of an error body.
///
/// Rows, auth and storage each name the field differently.
fn extract_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return if body.is_empty() {
            "Unknown error".to_string()
        } else {
            body.to_string()
        };
    };

    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|field| value.get(field).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}
