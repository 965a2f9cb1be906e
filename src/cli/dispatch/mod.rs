use crate::cli::{
    actions::{account, password, Action},
    globals::{default_state_file, GlobalArgs},
};
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

fn required(matches: &ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: --{name}"))
}

fn secret(matches: &ArgMatches, name: &str) -> Result<SecretString> {
    required(matches, name).map(SecretString::from)
}

/// Global options are read from the subcommand matches so they may appear
/// before or after the subcommand name.
pub fn globals(matches: &ArgMatches) -> Result<GlobalArgs> {
    let api_url = required(matches, "api-url")?;
    let timeout = matches.get_one::<u64>("timeout").copied().unwrap_or(10);
    let state_file = matches
        .get_one::<String>("state-file")
        .map_or_else(default_state_file, PathBuf::from);

    Ok(GlobalArgs::new(
        api_url,
        Duration::from_secs(timeout),
        state_file,
    ))
}

/// # Errors
/// Returns an error if the subcommand is unknown or required arguments are missing.
pub fn handler(matches: &ArgMatches) -> Result<(Action, GlobalArgs)> {
    let (name, sub_m) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("no subcommand given"))?;

    let action = match name {
        "signup" => Action::Signup(account::SignupArgs {
            name: required(sub_m, "name")?,
            email: required(sub_m, "email")?,
            password: secret(sub_m, "password")?,
            confirm_password: secret(sub_m, "confirm-password")?,
            phone: required(sub_m, "phone")?,
            company: required(sub_m, "company")?,
            address: required(sub_m, "address")?,
            agree_terms: sub_m.get_flag("agree-terms"),
        }),
        "login" => Action::Login(account::LoginArgs {
            email: required(sub_m, "email")?,
            password: secret(sub_m, "password")?,
        }),
        "logout" => Action::Logout,
        "forgot-password" => Action::ForgotPassword {
            email: required(sub_m, "email")?,
        },
        "reset-password" => Action::ResetPassword(password::ResetArgs {
            token: required(sub_m, "token")?,
            password: secret(sub_m, "password")?,
            confirm_password: secret(sub_m, "confirm-password")?,
        }),
        "resend-reset" => Action::ResendReset,
        "resend-verification" => Action::ResendVerification {
            email: sub_m.get_one::<String>("email").cloned(),
        },
        "whoami" => Action::WhoAmI,
        other => return Err(anyhow!("unknown subcommand: {other}")),
    };

    Ok((action, globals(sub_m)?))
}
