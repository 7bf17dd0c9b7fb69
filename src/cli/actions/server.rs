use crate::{cli::globals::GlobalArgs, qrorganizer};
use anyhow::{anyhow, Result};
use secrecy::ExposeSecret;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub globals: GlobalArgs,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the DSN is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let dsn = resolve_dsn(&args.dsn, &args.globals)?;

    qrorganizer::new(args.port, dsn, &args.globals).await
}

/// Inject `--db-password` into the DSN, if given.
///
/// # Errors
/// Returns an error if the DSN is not a valid URL or cannot carry a password.
pub fn resolve_dsn(dsn: &str, globals: &GlobalArgs) -> Result<String> {
    let mut dsn = Url::parse(dsn)?;

    if let Some(password) = &globals.db_password {
        dsn.set_password(Some(password.expose_secret()))
            .map_err(|()| anyhow!("Error setting password"))?;
    }

    Ok(dsn.to_string())
}

pub(crate) fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        (
            "db_password_set",
            args.globals.db_password.is_some().to_string(),
        ),
        (
            "restricted_environment",
            args.globals.restricted_environment.to_string(),
        ),
        (
            "require_confirmed_email",
            args.globals.require_confirmed_email.to_string(),
        ),
        (
            "session_ttl_seconds",
            args.globals.session_ttl_seconds.to_string(),
        ),
        ("secure_cookies", args.globals.secure_cookies.to_string()),
        (
            "password_min_length",
            args.globals.password_policy.required_length.to_string(),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} ({})\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
