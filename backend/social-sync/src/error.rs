/// Error types for social-sync
use supabase_rest::ClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote error: {0}")]
    Remote(#[from] ClientError),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Request already in flight: {0}")]
    InFlight(String),

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for SyncError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field))
                })
            })
            .collect();
        messages.sort();
        SyncError::Validation(messages.join(", "))
    }
}

impl SyncError {
    /// Remote rejections (network, constraint, auth) all map to the same generic failure
    /// for the caller; this is the string a notification would show.
    pub fn user_message(&self) -> &'static str {
        match self {
            SyncError::Validation(_) => "Please check the form and try again",
            SyncError::InFlight(_) => "Still working on your last action",
            SyncError::Unauthenticated => "Please sign in first",
            SyncError::Forbidden(_) => "You do not have access to this action",
            _ => "The action failed, please try again",
        }
    }
}

/// Result type alias for synchronizer operations
pub type SyncResult<T> = Result<T, SyncError>;
