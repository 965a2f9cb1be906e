use crate::session::{Acknowledgement, SessionClient};
use anyhow::{Context, Result};
use secrecy::SecretString;

#[derive(Debug)]
pub struct ResetArgs {
    pub token: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

fn report(ack: &Acknowledgement, default: &str) {
    println!("{}", ack.message().unwrap_or(default));
}

/// # Errors
/// Returns an error if the email is invalid or the request fails.
pub async fn forgot(client: &SessionClient, email: &str) -> Result<()> {
    let ack = client
        .forgot_password(email)
        .await
        .context("password reset request failed")?;
    report(&ack, "Reset link sent to your email! Check your inbox.");
    Ok(())
}

/// # Errors
/// Returns an error if validation or the reset request fails.
pub async fn reset(client: &SessionClient, args: ResetArgs) -> Result<()> {
    let ack = client
        .reset_password(&args.token, &args.password, &args.confirm_password)
        .await
        .map_err(|err| {
            // 400/401 from this endpoint means the link itself is no longer usable.
            if matches!(err.status(), Some(400 | 401)) {
                anyhow::Error::new(err)
                    .context("Invalid or expired reset link. Please request a new one.")
            } else {
                anyhow::Error::new(err).context("password reset failed")
            }
        })?;
    report(&ack, "Password reset successfully.");
    Ok(())
}

/// # Errors
/// Returns an error if no reset email is remembered or the request fails.
pub async fn resend_reset(client: &SessionClient) -> Result<()> {
    let ack = client
        .resend_reset_link()
        .await
        .context("resending the reset link failed")?;
    report(&ack, "Reset link sent to your email!");
    Ok(())
}
