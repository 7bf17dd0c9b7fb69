use crate::{
    account::password::PasswordPolicy,
    cli::{
        actions::{
            access_code, server,
            user::{self, UserCommand},
            Action,
        },
        commands::{
            access_code::{ARG_TTL_SECONDS, CMD_ACCESS_CODE, CMD_ISSUE},
            account::{
                ARG_PASSWORD_POLICY, ARG_REQUIRE_CONFIRMED_EMAIL, ARG_RESTRICTED_ENVIRONMENT,
                ARG_SECURE_COOKIES, ARG_SESSION_TTL_SECONDS,
            },
            user::{ARG_EMAIL, ARG_ROLE, CMD_ADD_ROLE, CMD_CONFIRM, CMD_USER},
            ARG_DB_PASSWORD, ARG_DSN, ARG_PORT,
        },
        globals::GlobalArgs,
    },
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;

/// Turn parsed arguments into the action to execute.
///
/// # Errors
/// Returns an error if a required argument is missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;

    let globals = GlobalArgs {
        db_password: matches
            .get_one::<String>(ARG_DB_PASSWORD)
            .map(|password| SecretString::from(password.clone())),
        restricted_environment: matches.get_flag(ARG_RESTRICTED_ENVIRONMENT),
        require_confirmed_email: matches
            .get_one::<bool>(ARG_REQUIRE_CONFIRMED_EMAIL)
            .copied()
            .unwrap_or(true),
        session_ttl_seconds: matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(604_800),
        secure_cookies: matches.get_flag(ARG_SECURE_COOKIES),
        password_policy: match matches
            .get_one::<String>(ARG_PASSWORD_POLICY)
            .map(String::as_str)
        {
            Some("relaxed") => PasswordPolicy::relaxed(),
            _ => PasswordPolicy::default(),
        },
    };

    match matches.subcommand() {
        Some((CMD_ACCESS_CODE, sub_m)) => match sub_m.subcommand() {
            Some((CMD_ISSUE, issue_m)) => Ok(Action::IssueAccessCode(access_code::Args {
                dsn,
                ttl_seconds: issue_m.get_one::<i64>(ARG_TTL_SECONDS).copied(),
                globals,
            })),
            _ => Err(anyhow!("unknown access-code subcommand")),
        },
        Some((CMD_USER, sub_m)) => {
            let command = match sub_m.subcommand() {
                Some((CMD_CONFIRM, confirm_m)) => UserCommand::Confirm {
                    email: required(confirm_m, ARG_EMAIL)?,
                },
                Some((CMD_ADD_ROLE, role_m)) => UserCommand::AddRole {
                    email: required(role_m, ARG_EMAIL)?,
                    role: required(role_m, ARG_ROLE)?,
                },
                _ => return Err(anyhow!("unknown user subcommand")),
            };
            Ok(Action::User(user::Args {
                dsn,
                command,
                globals,
            }))
        }
        _ => Ok(Action::Server(server::Args {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080),
            dsn,
            globals,
        })),
    }
}

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: <{name}>"))
}
