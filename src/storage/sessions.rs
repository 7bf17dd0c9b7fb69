use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing::{debug, Instrument};
use uuid::Uuid;

use super::is_unique_violation;
use crate::account::{
    password::verify_password,
    ports::{SignInOutcome, SignInService, UserIdentity},
    utils::{generate_token, hash_session_token},
};

/// Password sign-in backed by `user_sessions`. Only token hashes are stored.
#[derive(Clone, Debug)]
pub struct PgSignInService {
    pool: PgPool,
    session_ttl_seconds: i64,
    require_confirmed_email: bool,
}

impl PgSignInService {
    #[must_use]
    pub fn new(pool: PgPool, session_ttl_seconds: i64, require_confirmed_email: bool) -> Self {
        Self {
            pool,
            session_ttl_seconds,
            require_confirmed_email,
        }
    }

    /// Delete sessions whose `expires_at` has passed.
    async fn purge_expired_sessions(&self) -> Result<u64> {
        let query = "DELETE FROM user_sessions WHERE expires_at <= NOW()";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to purge expired sessions")?;

        Ok(result.rows_affected())
    }

    async fn insert_session(&self, user_id: Uuid) -> Result<String> {
        let purged = self.purge_expired_sessions().await?;
        if purged > 0 {
            debug!(purged, "Purged expired sessions");
        }

        let query = r"
            INSERT INTO user_sessions (user_id, session_hash, expires_at)
            VALUES ($1, $2, NOW() + ($3 * INTERVAL '1 second'))
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );

        // Retry only on hash collisions.
        for _ in 0..3 {
            let token = generate_token()?;
            let token_hash = hash_session_token(&token);
            let result = sqlx::query(query)
                .bind(user_id)
                .bind(token_hash)
                .bind(self.session_ttl_seconds)
                .execute(&self.pool)
                .instrument(span.clone())
                .await;

            match result {
                Ok(_) => return Ok(token),
                Err(err) if is_unique_violation(&err) => continue,
                Err(err) => return Err(err).context("failed to insert session"),
            }
        }

        Err(anyhow!("failed to allocate a unique session token"))
    }
}

#[async_trait]
impl SignInService for PgSignInService {
    async fn password_sign_in(
        &self,
        identity: &UserIdentity,
        password: &str,
    ) -> Result<SignInOutcome> {
        if self.require_confirmed_email && !identity.email_confirmed {
            debug!("Sign-in refused: email not confirmed");
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

        let token = self.insert_session(identity.id).await?;

        Ok(SignInOutcome::Succeeded {
            session_token: SecretString::from(token),
        })
    }

    async fn sign_out(&self, session_token: Option<&str>) -> Result<()> {
        let Some(token) = session_token else {
            return Ok(());
        };

        let query = "DELETE FROM user_sessions WHERE session_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(hash_session_token(token))
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;

        Ok(())
    }
}
