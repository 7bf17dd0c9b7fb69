pub mod access_code;
pub mod server;
pub mod user;

// Single dispatch point for `Action`.
mod run;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    IssueAccessCode(access_code::Args),
    User(user::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
