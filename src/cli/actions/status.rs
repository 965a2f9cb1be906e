use crate::{
    cli::actions::account::describe,
    session::{SessionClient, SessionEvent},
};
use anyhow::{anyhow, Context, Result};

/// # Errors
/// Returns an error if no email is available or the request fails.
pub async fn resend_verification(client: &SessionClient, email: Option<&str>) -> Result<()> {
    let email = match email {
        Some(email) => email.to_string(),
        None => client
            .reset_email_hint()?
            .ok_or_else(|| anyhow!("no email given and none remembered; pass --email"))?,
    };

    let ack = client
        .resend_verification_email(&email)
        .await
        .context("resending the verification email failed")?;
    println!(
        "{}",
        ack.message().unwrap_or("Verification email sent. Check your inbox.")
    );
    Ok(())
}

/// Confirms the stored session and reports it; a rejected session is not an error.
pub async fn whoami(client: &SessionClient) -> Result<()> {
    let mut events = client.subscribe();

    match client.restore().await {
        Some(user) => println!("Signed in as {}", describe(&user)),
        None => {
            if matches!(events.try_recv(), Ok(SessionEvent::Expired)) {
                println!("Session expired, please sign in again.");
            } else {
                println!("Not signed in.");
            }
        }
    }

    Ok(())
}
