pub mod account;
pub mod password;
pub mod status;

// Internal "interpreter" for `Action`, kept apart so this module stays small.
mod run;

use crate::cli::globals::GlobalArgs;

#[derive(Debug)]
pub enum Action {
    Signup(account::SignupArgs),
    Login(account::LoginArgs),
    Logout,
    ForgotPassword { email: String },
    ResetPassword(password::ResetArgs),
    ResendReset,
    ResendVerification { email: Option<String> },
    WhoAmI,
}

impl Action {
    /// Execute the action against the configured backend.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self, globals: &GlobalArgs) -> anyhow::Result<()> {
        run::execute(self, globals).await
    }
}
