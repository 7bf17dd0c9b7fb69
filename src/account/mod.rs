//! Account flows: restricted registration, login, and logout.
//!
//! [`AccountService`] owns no state of its own. Everything it needs comes in
//! through the collaborator traits in [`ports`], so the same flows run against
//! Postgres in production and against [`memory`] in tests.
//!
//! ## Registration order
//!
//! 1. Access code (restricted deployments only), consumed exactly once.
//! 2. Username length (at most [`MAX_USERNAME_CHARS`] characters).
//! 3. Password confirmation. A mismatch is reported as `Unauthorized`, not as
//!    a validation error.
//! 4. Identity store policy (email format, duplicates, password strength).

mod create;
mod error;
mod gate;
pub mod memory;
pub mod password;
pub mod ports;
mod session;
pub mod utils;

pub use create::{AccountCredentials, MAX_USERNAME_CHARS};
pub use error::AccountError;
pub use gate::AccessControlGate;
pub use session::{SignedIn, UserSession};

use std::sync::Arc;

use self::password::PasswordPolicy;
use self::ports::{IdentityError, IdentityStore, SignInService};
use self::utils::valid_email;

#[derive(Clone)]
pub struct AccountService {
    identities: Arc<dyn IdentityStore>,
    sign_in: Arc<dyn SignInService>,
    gate: AccessControlGate,
}

impl AccountService {
    #[must_use]
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        sign_in: Arc<dyn SignInService>,
        gate: AccessControlGate,
    ) -> Self {
        Self {
            identities,
            sign_in,
            gate,
        }
    }

    #[must_use]
    pub fn is_restricted(&self) -> bool {
        self.gate.is_restricted()
    }
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

/// Checks an identity store applies before inserting (duplicates aside).
///
/// `email` must already be normalized.
pub(crate) fn validate_new_identity(
    policy: &PasswordPolicy,
    email: &str,
    username: &str,
    password: &str,
) -> Vec<IdentityError> {
    let mut errors = Vec::new();
    if !valid_email(email) {
        errors.push(IdentityError::new(
            "InvalidEmail",
            format!("Email '{email}' is invalid."),
        ));
    }
    if username.trim().is_empty() {
        errors.push(IdentityError::new(
            "InvalidUserName",
            "Username must not be empty.",
        ));
    }
    errors.extend(policy.validate(password));
    errors
}
