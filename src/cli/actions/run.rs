use crate::cli::{
    actions::{account, password, status, Action},
    globals::GlobalArgs,
};
use anyhow::Result;

/// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action, globals: &GlobalArgs) -> Result<()> {
    let client = globals.client()?;

    match action {
        Action::Signup(args) => account::signup(&client, args).await,
        Action::Login(args) => account::login(&client, args).await,
        Action::Logout => account::logout(&client),
        Action::ForgotPassword { email } => password::forgot(&client, &email).await,
        Action::ResetPassword(args) => password::reset(&client, args).await,
        Action::ResendReset => password::resend_reset(&client).await,
        Action::ResendVerification { email } => {
            status::resend_verification(&client, email.as_deref()).await
        }
        Action::WhoAmI => status::whoami(&client).await,
    }
}
