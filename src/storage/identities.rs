use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::SecretString;
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use tracing::Instrument;

use super::{is_unique_violation, violated_constraint};
use crate::account::{
    password::{hash_password, PasswordPolicy},
    ports::{CreateIdentityError, IdentityError, IdentityStore, NewIdentity, UserIdentity},
    utils::normalize_email,
    validate_new_identity,
};

#[derive(Clone, Debug)]
pub struct PgIdentityStore {
    pool: PgPool,
    policy: PasswordPolicy,
}

impl PgIdentityStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_policy(pool, PasswordPolicy::default())
    }

    #[must_use]
    pub fn with_policy(pool: PgPool, policy: PasswordPolicy) -> Self {
        Self { pool, policy }
    }

    /// Mark the account email as confirmed.
    ///
    /// Returns `false` when no account has this email.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn confirm_email(&self, email: &str) -> Result<bool> {
        let query = r"
            UPDATE users
            SET email_confirmed = TRUE, updated_at = NOW()
            WHERE email = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(normalize_email(email))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to confirm email")?;

        Ok(result.rows_affected() > 0)
    }

    /// Grant a role. Granting a role the account already has is a no-op.
    ///
    /// Returns `false` when no account has this email.
    ///
    /// # Errors
    /// Returns an error if the lookup or insert fails.
    pub async fn add_role(&self, email: &str, role: &str) -> Result<bool> {
        let query = r"
            WITH target AS (
                SELECT id FROM users WHERE email = $1
            ), granted AS (
                INSERT INTO user_roles (user_id, role)
                SELECT id, $2 FROM target
                ON CONFLICT (user_id, role) DO NOTHING
            )
            SELECT EXISTS (SELECT 1 FROM target)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let found: bool = sqlx::query_scalar(query)
            .bind(normalize_email(email))
            .bind(role.trim())
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to grant role")?;

        Ok(found)
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        let query = r"
            SELECT id, email, username, password_hash, email_confirmed
            FROM users
            WHERE email = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by email")?;

        Ok(row.map(|row| UserIdentity {
            id: row.get("id"),
            email: row.get("email"),
            username: row.get("username"),
            password_hash: SecretString::from(row.get::<String, _>("password_hash")),
            email_confirmed: row.get("email_confirmed"),
        }))
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

        let query = r"
            INSERT INTO users (email, username, password_hash)
            VALUES ($1, $2, $3)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(&email)
            .bind(&identity.username)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                let rejection = match violated_constraint(&err) {
                    Some("users_username_key") => {
                        IdentityError::duplicate_username(&identity.username)
                    }
                    _ => IdentityError::duplicate_email(&email),
                };
                Err(CreateIdentityError::Rejected(vec![rejection]))
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert user")
                .into()),
        }
    }

    async fn is_email_confirmed(&self, identity: &UserIdentity) -> Result<bool> {
        let query = "SELECT email_confirmed FROM users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let confirmed: Option<bool> = sqlx::query_scalar(query)
            .bind(identity.id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to read email confirmation")?;

        Ok(confirmed.unwrap_or(false))
    }

    async fn get_roles(&self, identity: &UserIdentity) -> Result<BTreeSet<String>> {
        let query = "SELECT role FROM user_roles WHERE user_id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let roles: Vec<String> = sqlx::query_scalar(query)
            .bind(identity.id)
            .fetch_all(&self.pool)
            .instrument(span)
            .await
            .context("failed to load user roles")?;

        Ok(roles.into_iter().collect())
    }
}
