use crate::{
    cli::{
        actions::server::{redact_dsn, resolve_dsn},
        globals::GlobalArgs,
    },
    storage::{self, PgIdentityStore},
};
use anyhow::{bail, Result};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Confirm { email: String },
    AddRole { email: String, role: String },
}

#[derive(Debug)]
pub struct Args {
    pub dsn: String,
    pub command: UserCommand,
    pub globals: GlobalArgs,
}

/// Apply an operator change to an existing account.
/// # Errors
/// Returns an error if the database is unreachable or no account has the email.
pub async fn execute(args: Args) -> Result<()> {
    info!(dsn = %redact_dsn(&args.dsn), command = ?args.command, "Updating account");

    let dsn = resolve_dsn(&args.dsn, &args.globals)?;
    let store = PgIdentityStore::new(storage::connect(&dsn).await?);

    match args.command {
        UserCommand::Confirm { email } => {
            if !store.confirm_email(&email).await? {
                bail!("no account with email {email}");
            }
            println!("confirmed {email}");
        }
        UserCommand::AddRole { email, role } => {
            if !store.add_role(&email, &role).await? {
                bail!("no account with email {email}");
            }
            println!("granted {role} to {email}");
        }
    }

    Ok(())
}
