use crate::session::{Credentials, SessionClient, SignupProfile, UserRecord};
use anyhow::{Context, Result};
use secrecy::SecretString;

#[derive(Debug)]
pub struct SignupArgs {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
    pub phone: String,
    pub company: String,
    pub address: String,
    pub agree_terms: bool,
}

impl From<SignupArgs> for SignupProfile {
    fn from(args: SignupArgs) -> Self {
        Self {
            name: args.name,
            email: args.email,
            password: args.password,
            confirm_password: args.confirm_password,
            phone: args.phone,
            company_name: args.company,
            address: args.address,
            agree_terms: args.agree_terms,
        }
    }
}

#[derive(Debug)]
pub struct LoginArgs {
    pub email: String,
    pub password: SecretString,
}

/// One-line description of a user for terminal output.
pub(crate) fn describe(user: &UserRecord) -> String {
    match (user.name(), user.email(), user.id()) {
        (Some(name), Some(email), _) => format!("{name} <{email}>"),
        (None, Some(email), _) => email.to_string(),
        (Some(name), None, _) => name.to_string(),
        (None, None, Some(id)) => format!("user {id}"),
        (None, None, None) => user.as_json().to_string(),
    }
}

/// # Errors
/// Returns an error if validation or the signup request fails.
pub async fn signup(client: &SessionClient, args: SignupArgs) -> Result<()> {
    let profile = SignupProfile::from(args);
    let response = client.signup(&profile).await.context("signup failed")?;

    let message = response
        .message
        .as_deref()
        .unwrap_or("Account created successfully");
    println!("{message}");

    if client.is_authenticated() {
        if let Some(user) = response.user.as_ref() {
            println!("Signed in as {}", describe(user));
        }
    }

    Ok(())
}

/// # Errors
/// Returns an error if validation or the login request fails.
pub async fn login(client: &SessionClient, args: LoginArgs) -> Result<()> {
    let credentials = Credentials {
        email: args.email,
        password: args.password,
    };
    let outcome = client.login(&credentials).await.context("login failed")?;

    println!("{}", outcome.message);
    if let Some(user) = outcome.user.as_ref().filter(|_| outcome.authenticated) {
        println!("Signed in as {}", describe(user));
    }

    Ok(())
}

/// # Errors
/// Returns an error if the state file cannot be updated.
pub fn logout(client: &SessionClient) -> Result<()> {
    client.logout().context("logout failed")?;
    println!("Logged out");
    Ok(())
}
