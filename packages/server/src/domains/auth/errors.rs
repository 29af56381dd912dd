use thiserror::Error;

use crate::common::ApiError;
use crate::domains::users::UserStoreError;

/// Errors from the credentials and identity-sync flows
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email address has not been verified")]
    EmailNotVerified,

    #[error("Identity token has no email claim")]
    MissingEmailClaim,

    #[error("Operation not available with the {0} auth provider")]
    WrongProvider(&'static str),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<UserStoreError> for AuthError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::DuplicateEmail(_) => AuthError::EmailTaken,
            UserStoreError::Other(e) => AuthError::Internal(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => ApiError::BadRequest(msg),
            AuthError::EmailTaken => ApiError::Conflict(err.to_string()),
            AuthError::InvalidCredentials | AuthError::MissingEmailClaim => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::EmailNotVerified => ApiError::Forbidden(err.to_string()),
            AuthError::WrongProvider(_) => ApiError::NotFound(err.to_string()),
            AuthError::Internal(e) => ApiError::Internal(e),
        }
    }
}
