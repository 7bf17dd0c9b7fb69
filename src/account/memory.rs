//! In-memory collaborators honoring the same contracts as the Postgres
//! adapters. Used by tests and for running the service without a database.

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::password::{hash_password, verify_password, PasswordPolicy};
use super::ports::{
    AccessCodeError, AccessCodeStore, CreateIdentityError, IdentityError, IdentityStore,
    NewIdentity, SignInOutcome, SignInService, UserIdentity,
};
use super::utils::{generate_token, hash_session_token, normalize_email, now_unix_seconds};
use super::validate_new_identity;

struct StoredUser {
    identity: UserIdentity,
    roles: BTreeSet<String>,
}

/// Identity store keyed by normalized email.
pub struct MemoryIdentityStore {
    users: Mutex<HashMap<String, StoredUser>>,
    policy: PasswordPolicy,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(PasswordPolicy::default())
    }

    #[must_use]
    pub fn with_policy(policy: PasswordPolicy) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            policy,
        }
    }

    /// Number of stored identities.
    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }

    /// Mark the email as confirmed. Returns false when no such user exists.
    pub async fn confirm_email(&self, email: &str) -> bool {
        let mut users = self.users.lock().await;
        match users.get_mut(&normalize_email(email)) {
            Some(user) => {
                user.identity.email_confirmed = true;
                true
            }
            None => false,
        }
    }

    /// Grant a role. Returns false when no such user exists.
    pub async fn add_role(&self, email: &str, role: &str) -> bool {
        let mut users = self.users.lock().await;
        match users.get_mut(&normalize_email(email)) {
            Some(user) => {
                user.roles.insert(role.to_string());
                true
            }
            None => false,
        }
    }
}

impl Default for MemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        let users = self.users.lock().await;
        Ok(users
            .get(&normalize_email(email))
            .map(|user| user.identity.clone()))
    }

    async fn create(
        &self,
        identity: NewIdentity,
        password: &str,
    ) -> Result<(), CreateIdentityError> {
        let email = normalize_email(&identity.email);
        let errors = validate_new_identity(&self.policy, &email, &identity.username, password);
        if !errors.is_empty() {
            return Err(CreateIdentityError::Rejected(errors));
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .context("password hashing task failed")??;

        // Uniqueness is checked under the same lock as the insert.
        // Email is checked first, like the order of the unique constraints.
        let mut users = self.users.lock().await;
        if users.contains_key(&email) {
            return Err(CreateIdentityError::Rejected(vec![
                IdentityError::duplicate_email(&email),
            ]));
        }
        if users
            .values()
            .any(|user| user.identity.username == identity.username)
        {
            return Err(CreateIdentityError::Rejected(vec![
                IdentityError::duplicate_username(&identity.username),
            ]));
        }

        users.insert(
            email.clone(),
            StoredUser {
                identity: UserIdentity {
                    id: Uuid::new_v4(),
                    email,
                    username: identity.username,
                    password_hash: SecretString::from(password_hash),
                    email_confirmed: false,
                },
                roles: BTreeSet::new(),
            },
        );

        Ok(())
    }

    async fn is_email_confirmed(&self, identity: &UserIdentity) -> Result<bool> {
        let users = self.users.lock().await;
        Ok(users
            .get(&identity.email)
            .is_some_and(|user| user.identity.email_confirmed))
    }

    async fn get_roles(&self, identity: &UserIdentity) -> Result<BTreeSet<String>> {
        let users = self.users.lock().await;
        Ok(users
            .get(&identity.email)
            .map(|user| user.roles.clone())
            .unwrap_or_default())
    }
}

/// Sign-in service tracking live sessions by token hash.
pub struct MemorySignInService {
    sessions: Mutex<HashSet<Vec<u8>>>,
    require_confirmed_email: bool,
}

impl MemorySignInService {
    #[must_use]
    pub fn new(require_confirmed_email: bool) -> Self {
        Self {
            sessions: Mutex::new(HashSet::new()),
            require_confirmed_email,
        }
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl SignInService for MemorySignInService {
    async fn password_sign_in(
        &self,
        identity: &UserIdentity,
        password: &str,
    ) -> Result<SignInOutcome> {
        if self.require_confirmed_email && !identity.email_confirmed {
            return Ok(SignInOutcome::Failed);
        }

        let password = password.to_string();
        let stored = identity.password_hash.expose_secret().to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .context("password verification task failed")??;
        if !matches {
            return Ok(SignInOutcome::Failed);
        }

        let token = generate_token()?;
        self.sessions.lock().await.insert(hash_session_token(&token));

        Ok(SignInOutcome::Succeeded {
            session_token: SecretString::from(token),
        })
    }

    async fn sign_out(&self, session_token: Option<&str>) -> Result<()> {
        if let Some(token) = session_token {
            self.sessions
                .lock()
                .await
                .remove(&hash_session_token(token));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct AccessCodeRecord {
    expires_at_unix: Option<i64>,
    used: bool,
}

/// Access-code store whose check-and-set runs under one mutex guard.
pub struct MemoryAccessCodeStore {
    codes: Mutex<HashMap<String, AccessCodeRecord>>,
}

impl MemoryAccessCodeStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            codes: Mutex::new(HashMap::new()),
        }
    }

    /// Seed a code with an explicit expiry (unix seconds).
    pub async fn insert(&self, code: &str, expires_at_unix: Option<i64>) {
        self.codes.lock().await.insert(
            code.to_string(),
            AccessCodeRecord {
                expires_at_unix,
                used: false,
            },
        );
    }

    pub async fn is_used(&self, code: &str) -> bool {
        self.codes
            .lock()
            .await
            .get(code)
            .is_some_and(|record| record.used)
    }
}

impl Default for MemoryAccessCodeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessCodeStore for MemoryAccessCodeStore {
    async fn validate_and_use(&self, code: &str) -> Result<(), AccessCodeError> {
        let mut codes = self.codes.lock().await;
        let record = codes.get_mut(code).ok_or(AccessCodeError::NotFound)?;

        if record.used {
            return Err(AccessCodeError::AlreadyUsed);
        }
        if record
            .expires_at_unix
            .is_some_and(|expires_at| expires_at <= now_unix_seconds())
        {
            return Err(AccessCodeError::Expired);
        }

        record.used = true;
        Ok(())
    }

    async fn issue(&self, ttl_seconds: Option<i64>) -> Result<String> {
        let code = generate_token()?;
        let expires_at_unix = ttl_seconds.map(|ttl| now_unix_seconds().saturating_add(ttl));
        self.insert(&code, expires_at_unix).await;
        Ok(code)
    }
}
