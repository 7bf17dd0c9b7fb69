use super::ports::{AccessCodeError, IdentityError};
use thiserror::Error;

/// Failure taxonomy for the account operations.
///
/// `Unauthorized` and `Validation` map to different HTTP status classes and
/// must stay distinct.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account with that email could not be found")]
    NotFound,
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("unauthorized")]
    Unauthorized,
    #[error("Email is not verified - click link in email")]
    EmailNotConfirmed,
    #[error("identity creation rejected")]
    IdentityCreation(Vec<IdentityError>),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AccountError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(vec![message.into()])
    }
}

impl From<AccessCodeError> for AccountError {
    fn from(err: AccessCodeError) -> Self {
        match err {
            AccessCodeError::Store(err) => Self::Internal(err),
            rejection => Self::validation(rejection.to_string()),
        }
    }
}
