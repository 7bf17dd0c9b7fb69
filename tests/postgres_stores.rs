//! Postgres adapter tests.
//!
//! Skipped unless `QRORGANIZER_TEST_DSN` points at a scratch database. The
//! schema is applied idempotently and every test uses unique identifiers.

use anyhow::{anyhow, Context, Result};
use qrorganizer::{
    account::{
        ports::{
            AccessCodeError, AccessCodeStore, CreateIdentityError, IdentityStore, NewIdentity,
            SignInOutcome, SignInService,
        },
        utils::hash_session_token,
    },
    storage::{
        self, PgAccessCodeStore, PgIdentityStore, PgSignInService, PgSubscriptionCatalog,
    },
    subscription::SubscriptionCatalog,
};
use secrecy::ExposeSecret;
use sqlx::{Connection, PgConnection, PgPool};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));
const PASSWORD: &str = "Sup3r$ecret";

async fn test_pool() -> Result<Option<PgPool>> {
    let Ok(dsn) = std::env::var("QRORGANIZER_TEST_DSN") else {
        eprintln!("Skipping Postgres test: QRORGANIZER_TEST_DSN not set");
        return Ok(None);
    };

    let mut connection = PgConnection::connect(&dsn)
        .await
        .context("failed to connect for schema setup")?;
    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(&mut connection)
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }

    Ok(Some(storage::connect(&dsn).await?))
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn unique_user() -> NewIdentity {
    let suffix = Uuid::new_v4().simple().to_string();
    NewIdentity {
        email: format!("user-{suffix}@example.com"),
        username: format!("u{}", &suffix[..12]),
    }
}

#[test]
fn split_sql_statements_skips_comments() {
    let statements = split_sql_statements("-- header\nCREATE TABLE a (id INT);\n\nSELECT 1;\n");
    assert_eq!(statements, vec!["CREATE TABLE a (id INT);", "SELECT 1;"]);
}

#[tokio::test]
async fn identity_store_creates_and_rejects_duplicates() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let store = PgIdentityStore::new(pool);
    let user = unique_user();

    store
        .create(user.clone(), PASSWORD)
        .await
        .map_err(|err| anyhow!("create failed: {err}"))?;

    let found = store
        .find_by_email(&user.email.to_uppercase())
        .await?
        .context("identity not found")?;
    assert_eq!(found.username, user.username);
    assert!(!found.email_confirmed);
    assert!(found.password_hash.expose_secret().starts_with("$argon2"));

    let same_email = NewIdentity {
        email: user.email.clone(),
        username: unique_user().username,
    };
    match store.create(same_email, PASSWORD).await {
        Err(CreateIdentityError::Rejected(errors)) => assert_eq!(errors[0].code, "DuplicateEmail"),
        other => return Err(anyhow!("expected duplicate email, got {other:?}")),
    }

    let same_username = NewIdentity {
        email: unique_user().email,
        username: user.username.clone(),
    };
    match store.create(same_username, PASSWORD).await {
        Err(CreateIdentityError::Rejected(errors)) => {
            assert_eq!(errors[0].code, "DuplicateUserName");
        }
        other => return Err(anyhow!("expected duplicate username, got {other:?}")),
    }

    Ok(())
}

#[tokio::test]
async fn identity_store_applies_password_policy() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let store = PgIdentityStore::new(pool);

    match store.create(unique_user(), "short").await {
        Err(CreateIdentityError::Rejected(errors)) => {
            assert!(errors.iter().any(|e| e.code == "PasswordTooShort"));
        }
        other => return Err(anyhow!("expected policy rejection, got {other:?}")),
    }
    Ok(())
}

#[tokio::test]
async fn sign_in_stores_hashed_session_and_signs_out() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let identities = PgIdentityStore::new(pool.clone());
    let sign_in = PgSignInService::new(pool.clone(), 3600, true);
    let user = unique_user();
    identities
        .create(user.clone(), PASSWORD)
        .await
        .map_err(|err| anyhow!("create failed: {err}"))?;

    let identity = identities
        .find_by_email(&user.email)
        .await?
        .context("identity not found")?;
    let outcome = sign_in.password_sign_in(&identity, PASSWORD).await?;
    assert!(!outcome.succeeded(), "unconfirmed email must not sign in");

    assert!(identities.confirm_email(&user.email.to_uppercase()).await?);
    let identity = identities
        .find_by_email(&user.email)
        .await?
        .context("identity not found")?;
    assert!(identities.is_email_confirmed(&identity).await?);

    assert!(!sign_in
        .password_sign_in(&identity, "Wr0ng$pass")
        .await?
        .succeeded());

    let SignInOutcome::Succeeded { session_token } =
        sign_in.password_sign_in(&identity, PASSWORD).await?
    else {
        return Err(anyhow!("expected successful sign-in"));
    };
    let token_hash = hash_session_token(session_token.expose_secret());
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_sessions WHERE session_hash = $1")
            .bind(&token_hash)
            .fetch_one(&pool)
            .await?;
    assert_eq!(count, 1);

    sign_in
        .sign_out(Some(session_token.expose_secret()))
        .await?;
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_sessions WHERE session_hash = $1")
            .bind(&token_hash)
            .fetch_one(&pool)
            .await?;
    assert_eq!(count, 0);

    sign_in.sign_out(None).await?;
    Ok(())
}

#[tokio::test]
async fn roles_are_loaded_for_identity() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let identities = PgIdentityStore::new(pool.clone());
    let user = unique_user();
    identities
        .create(user.clone(), PASSWORD)
        .await
        .map_err(|err| anyhow!("create failed: {err}"))?;
    let identity = identities
        .find_by_email(&user.email)
        .await?
        .context("identity not found")?;

    for role in ["User", "Admin", "User"] {
        assert!(identities.add_role(&user.email, role).await?);
    }

    let roles: Vec<String> = identities.get_roles(&identity).await?.into_iter().collect();
    assert_eq!(roles, vec!["Admin".to_string(), "User".to_string()]);
    Ok(())
}

#[tokio::test]
async fn operator_updates_report_missing_accounts() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let identities = PgIdentityStore::new(pool);
    let missing = unique_user().email;

    assert!(!identities.confirm_email(&missing).await?);
    assert!(!identities.add_role(&missing, "Admin").await?);
    Ok(())
}

#[tokio::test]
async fn confirmed_account_created_through_store_can_sign_in() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let identities = PgIdentityStore::new(pool.clone());
    let sign_in = PgSignInService::new(pool, 3600, true);
    let user = unique_user();
    identities
        .create(user.clone(), PASSWORD)
        .await
        .map_err(|err| anyhow!("create failed: {err}"))?;

    assert!(identities.confirm_email(&user.email).await?);
    let identity = identities
        .find_by_email(&user.email)
        .await?
        .context("identity not found")?;
    assert!(identity.email_confirmed);
    assert!(sign_in.password_sign_in(&identity, PASSWORD).await?.succeeded());
    Ok(())
}

#[tokio::test]
async fn sign_in_purges_expired_sessions() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let identities = PgIdentityStore::new(pool.clone());
    let sign_in = PgSignInService::new(pool.clone(), 3600, false);
    let user = unique_user();
    identities
        .create(user.clone(), PASSWORD)
        .await
        .map_err(|err| anyhow!("create failed: {err}"))?;
    let identity = identities
        .find_by_email(&user.email)
        .await?
        .context("identity not found")?;

    let stale_hash = hash_session_token(&format!("stale-{}", Uuid::new_v4()));
    sqlx::query(
        "INSERT INTO user_sessions (user_id, session_hash, expires_at) VALUES ($1, $2, NOW() - INTERVAL '1 minute')",
    )
    .bind(identity.id)
    .bind(&stale_hash)
    .execute(&pool)
    .await?;

    assert!(sign_in.password_sign_in(&identity, PASSWORD).await?.succeeded());

    let stale: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_sessions WHERE session_hash = $1")
            .bind(&stale_hash)
            .fetch_one(&pool)
            .await?;
    assert_eq!(stale, 0);
    let live: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_sessions WHERE user_id = $1")
        .bind(identity.id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(live, 1);
    Ok(())
}

#[tokio::test]
async fn access_code_is_consumed_once() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let store = PgAccessCodeStore::new(pool);
    let code = store.issue(None).await?;

    store
        .validate_and_use(&code)
        .await
        .map_err(|err| anyhow!("first redemption failed: {err}"))?;
    assert!(matches!(
        store.validate_and_use(&code).await,
        Err(AccessCodeError::AlreadyUsed)
    ));
    assert!(matches!(
        store.validate_and_use("no-such-code").await,
        Err(AccessCodeError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn expired_access_code_is_rejected() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let code = format!("expired-{}", Uuid::new_v4());
    sqlx::query(
        "INSERT INTO access_codes (code, expires_at) VALUES ($1, NOW() - INTERVAL '1 minute')",
    )
    .bind(&code)
    .execute(&pool)
    .await?;

    let store = PgAccessCodeStore::new(pool);
    assert!(matches!(
        store.validate_and_use(&code).await,
        Err(AccessCodeError::Expired)
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemptions_have_one_winner() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let store = PgAccessCodeStore::new(pool);
    let code = store.issue(Some(600)).await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let code = code.clone();
        handles.push(tokio::spawn(
            async move { store.validate_and_use(&code).await },
        ));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => successes += 1,
            Err(AccessCodeError::AlreadyUsed) => {}
            Err(err) => return Err(anyhow!("unexpected redemption error: {err}")),
        }
    }
    assert_eq!(successes, 1);
    Ok(())
}

#[tokio::test]
async fn catalog_loads_levels_with_features() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let name = format!("Level {}", Uuid::new_v4());
    let level_id: i32 = sqlx::query_scalar(
        "INSERT INTO subscription_levels (subscription_name) VALUES ($1) RETURNING id",
    )
    .bind(&name)
    .fetch_one(&pool)
    .await?;
    for feature in ["Dynamic QR", "Analytics"] {
        sqlx::query(
            "INSERT INTO subscription_features (subscription_level_id, feature_name) VALUES ($1, $2)",
        )
        .bind(level_id)
        .bind(feature)
        .execute(&pool)
        .await?;
    }

    let levels = PgSubscriptionCatalog::new(pool.clone()).list_levels().await?;
    let level = levels
        .iter()
        .find(|level| level.id() == level_id)
        .context("level missing from catalog")?;
    assert_eq!(level.subscription_name(), name);
    let features: Vec<&str> = level
        .features()
        .iter()
        .map(|f| f.feature_name.as_str())
        .collect();
    assert_eq!(features, vec!["Dynamic QR", "Analytics"]);

    sqlx::query("DELETE FROM subscription_levels WHERE id = $1")
        .bind(level_id)
        .execute(&pool)
        .await?;
    let orphans: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM subscription_features WHERE subscription_level_id = $1",
    )
    .bind(level_id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(orphans, 0);
    Ok(())
}
