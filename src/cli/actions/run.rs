use crate::cli::{
    actions::{access_code, server, user, Action},
    telemetry,
};
use anyhow::Result;

/// Execute the provided action, flushing traces afterwards.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    let result = match action {
        Action::Server(args) => server::execute(args).await,
        Action::IssueAccessCode(args) => access_code::execute(args).await,
        Action::User(args) => user::execute(args).await,
    };

    telemetry::shutdown_tracer();

    result
}
