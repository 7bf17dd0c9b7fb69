//! Collaborator contracts consumed by the account service.
//!
//! The account flows only talk to identities, sign-in, and access codes
//! through these traits. Postgres adapters live in [`crate::storage`]; the
//! in-memory versions in [`super::memory`] implement the same contracts.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// A persisted user record. The password hash never leaves the adapters.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: SecretString,
    pub email_confirmed: bool,
}

/// Fields needed to create an identity; the password travels separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub email: String,
    pub username: String,
}

/// Structured reason an identity store refused to create a user.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentityError {
    pub code: String,
    pub description: String,
}

impl IdentityError {
    #[must_use]
    pub fn new(code: &str, description: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn duplicate_email(email: &str) -> Self {
        Self::new("DuplicateEmail", format!("Email '{email}' is already taken."))
    }

    #[must_use]
    pub fn duplicate_username(username: &str) -> Self {
        Self::new(
            "DuplicateUserName",
            format!("Username '{username}' is already taken."),
        )
    }
}

#[derive(Debug, Error)]
pub enum CreateIdentityError {
    #[error("identity rejected with {} error(s)", .0.len())]
    Rejected(Vec<IdentityError>),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<UserIdentity>>;

    /// Validation failures are reported together. A duplicate is reported
    /// alone: email before username, one error.
    async fn create(&self, identity: NewIdentity, password: &str)
        -> Result<(), CreateIdentityError>;

    async fn is_email_confirmed(&self, identity: &UserIdentity) -> anyhow::Result<bool>;

    async fn get_roles(&self, identity: &UserIdentity) -> anyhow::Result<BTreeSet<String>>;
}

/// Result of a single password sign-in attempt.
#[derive(Debug)]
pub enum SignInOutcome {
    /// Credentials matched; the raw token is handed back once for the cookie.
    Succeeded { session_token: SecretString },
    Failed,
}

impl SignInOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

#[async_trait]
pub trait SignInService: Send + Sync {
    async fn password_sign_in(
        &self,
        identity: &UserIdentity,
        password: &str,
    ) -> anyhow::Result<SignInOutcome>;

    async fn sign_out(&self, session_token: Option<&str>) -> anyhow::Result<()>;
}

/// Why an access code could not be redeemed.
#[derive(Debug, Error)]
pub enum AccessCodeError {
    #[error("Access code is required")]
    Missing,
    #[error("Access code is invalid")]
    NotFound,
    #[error("Access code has expired")]
    Expired,
    #[error("Access code has already been used")]
    AlreadyUsed,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[async_trait]
pub trait AccessCodeStore: Send + Sync {
    /// Check that `code` exists, is unexpired and unused, and mark it used.
    ///
    /// Implementations must make the check and the update a single atomic
    /// step: of several concurrent calls with one code, at most one succeeds.
    async fn validate_and_use(&self, code: &str) -> Result<(), AccessCodeError>;

    /// Mint a new single-use code, optionally expiring after `ttl_seconds`.
    async fn issue(&self, ttl_seconds: Option<i64>) -> anyhow::Result<String>;
}
