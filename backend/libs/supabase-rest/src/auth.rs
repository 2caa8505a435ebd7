//! Password authentication against `/auth/v1`

use crate::error::ClientResult;
use crate::{check_status, decode, SupabaseClient};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Authenticated user as reported by the auth endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Token pair plus the user it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Sign-up answers with a full session when auto-confirm is on, else with the bare user
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(Session),
    User(AuthUser),
}

impl SupabaseClient {
    /// Sign in with email + password and keep the session
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> ClientResult<Session> {
        let url = format!("{}/auth/v1/token", self.config().url);
        let response = self
            .http()
            .post(&url)
            .query(&[("grant_type", "password")])
            .header("apikey", &self.config().anon_key)
            .json(&Credentials { email, password })
            .send()
            .await?;

        let session: Session = decode(response).await?;
        info!(user_id = %session.user.id, "signed in");
        self.set_session(Some(session.clone())).await;
        Ok(session)
    }

    /// Register a new account.
    ///
    /// Returns the created user; when the project auto-confirms, the session is kept too.
    pub async fn sign_up(&self, email: &str, password: &str) -> ClientResult<AuthUser> {
        let url = format!("{}/auth/v1/signup", self.config().url);
        let response = self
            .http()
            .post(&url)
            .header("apikey", &self.config().anon_key)
            .json(&Credentials { email, password })
            .send()
            .await?;

        match decode::<SignUpResponse>(response).await? {
            SignUpResponse::Session(session) => {
                let user = session.user.clone();
                self.set_session(Some(session)).await;
                Ok(user)
            }
            SignUpResponse::User(user) => Ok(user),
        }
    }

    /// Revoke the session server-side and forget it locally
    pub async fn sign_out(&self) -> ClientResult<()> {
        if self.session().await.is_none() {
            return Ok(());
        }

        let url = format!("{}/auth/v1/logout", self.config().url);
        let request = self.authorized(self.http().post(&url)).await;
        let result = request.send().await;

        // The local session is dropped even if revocation fails
        self.set_session(None).await;
        check_status(result?).await?;
        debug!("signed out");
        Ok(())
    }

    /// Resolve the user behind the current session, if any
    pub async fn current_user(&self) -> ClientResult<Option<AuthUser>> {
        if self.session().await.is_none() {
            return Ok(None);
        }

        let url = format!("{}/auth/v1/user", self.config().url);
        let response = self.authorized(self.http().get(&url)).await.send().await?;
        Ok(Some(decode(response).await?))
    }
}
