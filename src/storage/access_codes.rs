use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;

use crate::account::{
    ports::{AccessCodeError, AccessCodeStore},
    utils::generate_token,
};

#[derive(Clone, Debug)]
pub struct PgAccessCodeStore {
    pool: PgPool,
}

impl PgAccessCodeStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain why a code could not be consumed.
    async fn classify_rejection(&self, code: &str) -> Result<AccessCodeError> {
        let query = r"
            SELECT used_at IS NOT NULL AS used,
                   expires_at IS NOT NULL AND expires_at <= NOW() AS expired
            FROM access_codes
            WHERE code = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(code)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup access code")?;

        Ok(match row {
            None => AccessCodeError::NotFound,
            Some(row) if row.get::<bool, _>("used") => AccessCodeError::AlreadyUsed,
            Some(row) if row.get::<bool, _>("expired") => AccessCodeError::Expired,
            // Lost a race with a concurrent redemption.
            Some(_) => AccessCodeError::AlreadyUsed,
        })
    }
}

#[async_trait]
impl AccessCodeStore for PgAccessCodeStore {
    async fn validate_and_use(&self, code: &str) -> Result<(), AccessCodeError> {
        // One conditional UPDATE: the row lock makes concurrent redemptions
        // serialize, and only the first sees `used_at IS NULL`.
        let query = r"
            UPDATE access_codes
            SET used_at = NOW()
            WHERE code = $1
              AND used_at IS NULL
              AND (expires_at IS NULL OR expires_at > NOW())
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(code)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to consume access code")?;

        if row.is_some() {
            return Ok(());
        }

        Err(self.classify_rejection(code).await?)
    }

    async fn issue(&self, ttl_seconds: Option<i64>) -> Result<String> {
        let code = generate_token()?;
        let query = r"
            INSERT INTO access_codes (code, expires_at)
            VALUES (
                $1,
                CASE WHEN $2::BIGINT IS NULL THEN NULL
                     ELSE NOW() + ($2::BIGINT * INTERVAL '1 second')
                END
            )
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(&code)
            .bind(ttl_seconds)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert access code")?;

        Ok(code)
    }
}
