//! Account creation: access-code gate, field checks, identity creation.

use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::{
    error::AccountError,
    ports::{CreateIdentityError, NewIdentity},
    AccountService,
};

/// Longest accepted username, counted in characters.
pub const MAX_USERNAME_CHARS: usize = 16;

/// Registration payload. Only lives for the duration of one request.
#[derive(ToSchema, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountCredentials {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub restricted_access_code: Option<String>,
}

impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"***")
            .field("confirm_password", &"***")
            .field(
                "restricted_access_code",
                &self.restricted_access_code.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

pub(super) fn check_username(username: &str) -> Result<(), AccountError> {
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(AccountError::validation(format!(
            "Username must be {MAX_USERNAME_CHARS} characters or less"
        )));
    }
    Ok(())
}

impl AccountService {
    /// Create a new account.
    ///
    /// Checks run in a fixed order and the first failure wins: access code
    /// (restricted deployments only), username length, password confirmation,
    /// then the identity store's own policy.
    ///
    /// # Errors
    /// - `Validation` for a bad access code or an over-long username
    /// - `Unauthorized` when the confirmation does not match the password
    /// - `IdentityCreation` carrying the store's rejection unchanged
    /// - `Internal` for collaborator failures
    #[instrument(skip_all, fields(email = %creds.email, username = %creds.username))]
    pub async fn create_account(&self, creds: &AccountCredentials) -> Result<(), AccountError> {
        self.gate
            .validate_and_consume(creds.restricted_access_code.as_deref())
            .await?;

        check_username(&creds.username)?;

        if creds.password != creds.confirm_password {
            debug!("Password confirmation mismatch");
            return Err(AccountError::Unauthorized);
        }

        let identity = NewIdentity {
            email: creds.email.clone(),
            username: creds.username.clone(),
        };

        match self.identities.create(identity, &creds.password).await {
            Ok(()) => {
                info!("Account created");
                Ok(())
            }
            Err(CreateIdentityError::Rejected(errors)) => {
                debug!("Identity store rejected account: {errors:?}");
                Err(AccountError::IdentityCreation(errors))
            }
            Err(CreateIdentityError::Store(err)) => Err(AccountError::Internal(err)),
        }
    }
}
