use std::time::Duration;

use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum LoginError {
    /// Rejected up front: another attempt has not resolved yet.
    #[error("A login attempt is already in progress")]
    InProgress,

    #[error("Login request timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl LoginError {
    /// Short text suitable for an alert, also recorded as the failure reason.
    pub fn user_message(&self) -> String {
        match self {
            LoginError::InProgress => "Login already in progress".to_string(),
            LoginError::TimedOut(_) => "Login request timed out. Please try again.".to_string(),
            LoginError::Api(ApiError::Status { message, .. }) => message.clone(),
            LoginError::Api(e) => e.user_message(),
        }
    }

    /// True when the server answered and refused the credentials.
    pub fn is_rejected(&self) -> bool {
        matches!(self, LoginError::Api(ApiError::Status { .. }))
    }
}
