use clap::{Arg, Command};

pub const CMD_ACCESS_CODE: &str = "access-code";
pub const CMD_ISSUE: &str = "issue";
pub const ARG_TTL_SECONDS: &str = "ttl-seconds";

#[must_use]
pub fn subcommand() -> Command {
    Command::new(CMD_ACCESS_CODE)
        .about("Manage registration access codes")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_ISSUE)
                .about("Issue a new single-use access code and print it")
                .arg(
                    Arg::new(ARG_TTL_SECONDS)
                        .long(ARG_TTL_SECONDS)
                        .help("Expire the code after this many seconds (default: never)")
                        .value_parser(clap::value_parser!(i64).range(1..)),
                ),
        )
}
