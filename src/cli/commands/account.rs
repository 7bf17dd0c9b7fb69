use clap::{Arg, ArgAction, Command};

pub const ARG_RESTRICTED_ENVIRONMENT: &str = "restricted-environment";
pub const ARG_REQUIRE_CONFIRMED_EMAIL: &str = "require-confirmed-email";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_SECURE_COOKIES: &str = "secure-cookies";
pub const ARG_PASSWORD_POLICY: &str = "password-policy";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RESTRICTED_ENVIRONMENT)
                .long(ARG_RESTRICTED_ENVIRONMENT)
                .help("Only create accounts for callers presenting a valid access code")
                .env("QRORGANIZER_RESTRICTED_ENVIRONMENT")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_REQUIRE_CONFIRMED_EMAIL)
                .long(ARG_REQUIRE_CONFIRMED_EMAIL)
                .help("Refuse sign-in until the account email is confirmed")
                .env("QRORGANIZER_REQUIRE_CONFIRMED_EMAIL")
                .default_value("true")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("QRORGANIZER_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SECURE_COOKIES)
                .long(ARG_SECURE_COOKIES)
                .help("Mark the session cookie Secure (serve over HTTPS)")
                .env("QRORGANIZER_SECURE_COOKIES")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_PASSWORD_POLICY)
                .long(ARG_PASSWORD_POLICY)
                .help("Password rules for new accounts (relaxed accepts any non-empty password)")
                .env("QRORGANIZER_PASSWORD_POLICY")
                .default_value("default")
                .value_parser(["default", "relaxed"]),
        )
}
