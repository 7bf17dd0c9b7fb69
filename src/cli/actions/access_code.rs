use crate::{
    account::ports::AccessCodeStore,
    cli::{
        actions::server::{redact_dsn, resolve_dsn},
        globals::GlobalArgs,
    },
    storage::{self, PgAccessCodeStore},
};
use anyhow::Result;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
    pub ttl_seconds: Option<i64>,
    pub globals: GlobalArgs,
}

/// Issue a single-use access code and print it on stdout.
/// # Errors
/// Returns an error if the database is unreachable or the insert fails.
pub async fn execute(args: Args) -> Result<()> {
    info!(dsn = %redact_dsn(&args.dsn), ttl_seconds = ?args.ttl_seconds, "Issuing access code");

    let dsn = resolve_dsn(&args.dsn, &args.globals)?;
    let pool = storage::connect(&dsn).await?;

    let code = PgAccessCodeStore::new(pool).issue(args.ttl_seconds).await?;

    println!("{code}");

    Ok(())
}
