//! Login and logout.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use super::{error::AccountError, ports::SignInOutcome, AccountService};

/// Authenticated-user view returned by a successful login.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub email: String,
    pub roles: Vec<String>,
}

/// Successful login: the public session view plus the token for the cookie.
#[derive(Debug)]
pub struct SignedIn {
    pub session: UserSession,
    pub session_token: SecretString,
}

impl AccountService {
    /// Authenticate with email and password (one attempt, no lockout).
    ///
    /// # Errors
    /// - `NotFound` when no identity has that email
    /// - `EmailNotConfirmed` when sign-in fails and the email is unconfirmed
    /// - `Unauthorized` for any other sign-in failure
    /// - `Internal` for collaborator failures
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<SignedIn, AccountError> {
        let Some(identity) = self.identities.find_by_email(email).await? else {
            debug!("No identity for email");
            return Err(AccountError::NotFound);
        };

        let SignInOutcome::Succeeded { session_token } =
            self.sign_in.password_sign_in(&identity, password).await?
        else {
            if !self.identities.is_email_confirmed(&identity).await? {
                return Err(AccountError::EmailNotConfirmed);
            }
            debug!("Password sign-in failed");
            return Err(AccountError::Unauthorized);
        };

        let roles = self.identities.get_roles(&identity).await?;

        Ok(SignedIn {
            session: UserSession {
                email: identity.email,
                roles: roles.into_iter().collect(),
            },
            session_token,
        })
    }

    /// End the session. Never fails from the caller's point of view.
    #[instrument(skip_all)]
    pub async fn logout(&self, session_token: Option<&str>) {
        if let Err(err) = self.sign_in.sign_out(session_token).await {
            error!("Failed to sign out: {err}");
        }
    }
}
