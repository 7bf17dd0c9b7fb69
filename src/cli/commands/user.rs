use clap::{builder::NonEmptyStringValueParser, Arg, Command};

pub const CMD_USER: &str = "user";
pub const CMD_CONFIRM: &str = "confirm";
pub const CMD_ADD_ROLE: &str = "add-role";
pub const ARG_EMAIL: &str = "email";
pub const ARG_ROLE: &str = "role";

fn email_arg() -> Arg {
    Arg::new(ARG_EMAIL)
        .help("Account email")
        .required(true)
        .value_parser(NonEmptyStringValueParser::new())
}

#[must_use]
pub fn subcommand() -> Command {
    Command::new(CMD_USER)
        .about("Operator actions on existing accounts")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_CONFIRM)
                .about("Mark the account email as confirmed so it can sign in")
                .arg(email_arg()),
        )
        .subcommand(
            Command::new(CMD_ADD_ROLE)
                .about("Grant a role to the account")
                .arg(email_arg())
                .arg(
                    Arg::new(ARG_ROLE)
                        .help("Role name, e.g. Admin")
                        .required(true)
                        .value_parser(NonEmptyStringValueParser::new()),
                ),
        )
}
