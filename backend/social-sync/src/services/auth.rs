use crate::config::SyncConfig;
use crate::domain::models::{NewUserProfile, Role, UserProfile};
use crate::error::{SyncError, SyncResult};
use crate::repository::AuthRepository;
use std::sync::Arc;
use supabase_rest::AuthUser;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Who is signed in, as observed by subscribers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub profile: Option<UserProfile>,
    pub loading: bool,
}

impl AuthState {
    pub fn is_admin(&self) -> bool {
        self.profile
            .as_ref()
            .map(|p| p.role == Role::Admin)
            .unwrap_or(false)
    }
}

/// Authentication session
///
/// Every change is published on a `watch` channel so views can follow sign-in and
/// sign-out without polling.
pub struct AuthStore {
    repo: Arc<dyn AuthRepository>,
    sync: SyncConfig,
    state: watch::Sender<AuthState>,
}

impl AuthStore {
    pub fn new(repo: Arc<dyn AuthRepository>, config: &SyncConfig) -> Self {
        let (state, _) = watch::channel(AuthState {
            loading: true,
            ..AuthState::default()
        });
        Self {
            repo,
            sync: config.clone(),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().user.clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.state.borrow().profile.clone()
    }

    pub fn is_admin(&self) -> bool {
        self.state.borrow().is_admin()
    }

    /// Signed-in user, or `Unauthenticated`
    pub fn require_user(&self) -> SyncResult<AuthUser> {
        self.current_user().ok_or(SyncError::Unauthenticated)
    }

    /// Passes only for a signed-in admin
    pub fn require_admin(&self) -> SyncResult<AuthUser> {
        let user = self.require_user()?;
        if !self.is_admin() {
            return Err(SyncError::Forbidden(format!(
                "user {} is not an admin",
                user.id
            )));
        }
        Ok(user)
    }

    fn publish(&self, user: Option<AuthUser>, profile: Option<UserProfile>) {
        self.state.send_modify(|state| {
            state.user = user;
            state.profile = profile;
        });
    }

    /// Restore the user behind an existing session. Never fails: errors are logged and
    /// `loading` is cleared either way.
    pub async fn initialize(&self) {
        match self.repo.current_user().await {
            Ok(Some(user)) => match self.repo.fetch_profile(&user.id).await {
                Ok(profile) => self.publish(Some(user), profile),
                Err(e) => {
                    warn!(user_id = %user.id, error = %e, "Failed to load profile");
                    self.publish(Some(user), None);
                }
            },
            Ok(None) => {}
            Err(e) => error!(error = %e, "Auth initialization error"),
        }

        self.state.send_modify(|state| state.loading = false);
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> SyncResult<AuthState> {
        let user = self.repo.sign_in(email, password).await?;

        let profile = match self.repo.fetch_profile(&user.id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Signed in without profile");
                None
            }
        };

        info!(user_id = %user.id, "User signed in");
        self.publish(Some(user), profile);
        Ok(self.snapshot())
    }

    /// Create an account plus its `users` row. Emails on the admin list get the admin role.
    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> SyncResult<AuthUser> {
        let user = self.repo.sign_up(email, password).await?;

        let role = if self.sync.is_admin_email(email) {
            Role::Admin
        } else {
            Role::User
        };

        self.repo
            .insert_profile(&NewUserProfile {
                id: user.id.clone(),
                email: email.to_string(),
                full_name: full_name.to_string(),
                role,
            })
            .await?;

        info!(user_id = %user.id, ?role, "User signed up");
        Ok(user)
    }

    pub async fn sign_out(&self) -> SyncResult<()> {
        let result = self.repo.sign_out().await;
        // Local session is cleared even when remote revocation fails
        self.publish(None, None);
        if let Err(e) = &result {
            warn!(error = %e, "Remote sign-out failed");
        }
        result
    }
}
