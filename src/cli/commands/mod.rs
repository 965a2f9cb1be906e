use crate::session::config::DEFAULT_API_BASE_URL;
use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};

const DEFAULT_TIMEOUT_SECS: &str = "10";

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

fn email_arg(required: bool) -> Arg {
    Arg::new("email")
        .short('e')
        .long("email")
        .help("Account email address")
        .env("PORTAL_EMAIL")
        .required(required)
}

fn password_arg() -> Arg {
    Arg::new("password")
        .short('p')
        .long("password")
        .help("Account password")
        .env("PORTAL_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

fn confirm_password_arg() -> Arg {
    Arg::new("confirm-password")
        .long("confirm-password")
        .help("Password confirmation, must match --password")
        .env("PORTAL_CONFIRM_PASSWORD")
        .hide_env_values(true)
        .required(true)
}

fn subcommand_signup() -> Command {
    Command::new("signup")
        .about("Register a new portal account")
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .help("Full name")
                .required(true),
        )
        .arg(email_arg(true))
        .arg(password_arg())
        .arg(confirm_password_arg())
        .arg(
            Arg::new("phone")
                .long("phone")
                .help("Phone number, 10 to 15 digits with optional leading +")
                .required(true),
        )
        .arg(
            Arg::new("company")
                .long("company")
                .help("Company or institution name")
                .required(true),
        )
        .arg(
            Arg::new("address")
                .long("address")
                .help("Postal address")
                .required(true),
        )
        .arg(
            Arg::new("agree-terms")
                .long("agree-terms")
                .help("Accept the terms and conditions")
                .action(ArgAction::SetTrue),
        )
}

fn subcommand_login() -> Command {
    Command::new("login")
        .about("Sign in and store the session token")
        .arg(email_arg(true))
        .arg(password_arg())
}

fn subcommand_reset_password() -> Command {
    Command::new("reset-password")
        .about("Set a new password using the token from the reset link")
        .arg(
            Arg::new("token")
                .short('t')
                .long("token")
                .help("Reset token from the emailed link")
                .required(true),
        )
        .arg(password_arg())
        .arg(confirm_password_arg())
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("portal-session")
        .about("Session client for the university portal")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .short('u')
                .long("api-url")
                .help("Portal API base URL")
                .default_value(DEFAULT_API_BASE_URL)
                .env("PORTAL_API_URL")
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Request timeout in seconds")
                .default_value(DEFAULT_TIMEOUT_SECS)
                .env("PORTAL_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("state-file")
                .long("state-file")
                .help("Where the session token and reset-email hint are kept")
                .env("PORTAL_STATE_FILE")
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("PORTAL_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .subcommand(subcommand_signup())
        .subcommand(subcommand_login())
        .subcommand(Command::new("logout").about("Forget the stored session"))
        .subcommand(
            Command::new("forgot-password")
                .about("Email a password reset link")
                .arg(email_arg(true)),
        )
        .subcommand(subcommand_reset_password())
        .subcommand(
            Command::new("resend-reset")
                .about("Re-send the reset link to the last address used with forgot-password"),
        )
        .subcommand(
            Command::new("resend-verification")
                .about("Re-send the account verification email")
                .arg(email_arg(false)),
        )
        .subcommand(Command::new("whoami").about("Check the stored session with the backend"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "portal-session");
        assert_eq!(
            command.get_about().unwrap().to_string(),
            "Session client for the university portal"
        );
        assert_eq!(
            command.get_version().unwrap().to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn test_login_args() {
        temp_env::with_vars(
            [
                ("PORTAL_API_URL", None::<&str>),
                ("PORTAL_PASSWORD", None::<&str>),
            ],
            || {
                let matches = new().get_matches_from(vec![
                    "portal-session",
                    "login",
                    "--email",
                    "student@uni.edu",
                    "--password",
                    "Passw0rd",
                ]);

                assert_eq!(
                    matches.get_one::<String>("api-url").map(String::as_str),
                    Some("http://localhost:5000")
                );
                assert_eq!(matches.get_one::<u64>("timeout").copied(), Some(10));

                let (name, sub) = matches.subcommand().unwrap();
                assert_eq!(name, "login");
                assert_eq!(
                    sub.get_one::<String>("email").map(String::as_str),
                    Some("student@uni.edu")
                );
                assert_eq!(
                    sub.get_one::<String>("password").map(String::as_str),
                    Some("Passw0rd")
                );
            },
        );
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("PORTAL_API_URL", Some("https://api.portal.edu")),
                ("PORTAL_TIMEOUT", Some("3")),
                ("PORTAL_STATE_FILE", Some("/tmp/portal.json")),
                ("PORTAL_LOG_LEVEL", Some("info")),
                ("PORTAL_EMAIL", Some("student@uni.edu")),
            ],
            || {
                let matches = new().get_matches_from(vec!["portal-session", "forgot-password"]);
                assert_eq!(
                    matches.get_one::<String>("api-url").map(String::as_str),
                    Some("https://api.portal.edu")
                );
                assert_eq!(matches.get_one::<u64>("timeout").copied(), Some(3));
                assert_eq!(
                    matches.get_one::<String>("state-file").map(String::as_str),
                    Some("/tmp/portal.json")
                );
                assert_eq!(matches.get_one::<u8>("verbosity").copied(), Some(2));

                let (_, sub) = matches.subcommand().unwrap();
                assert_eq!(
                    sub.get_one::<String>("email").map(String::as_str),
                    Some("student@uni.edu")
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_verbosity() {
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, _) in levels.iter().enumerate() {
            temp_env::with_vars([("PORTAL_LOG_LEVEL", None::<String>)], || {
                let mut args = vec!["portal-session".to_string()];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }
                args.push("logout".to_string());

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>("verbosity").copied(),
                    Some(index as u8)
                );
            });
        }
    }

    #[test]
    fn test_reset_password_requires_confirmation() {
        temp_env::with_vars([("PORTAL_CONFIRM_PASSWORD", None::<&str>)], || {
            let result = new().try_get_matches_from(vec![
                "portal-session",
                "reset-password",
                "--token",
                "abc",
                "--password",
                "Passw0rd",
            ]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_timeout_must_be_positive() {
        let result = new().try_get_matches_from(vec!["portal-session", "--timeout", "0", "whoami"]);
        assert!(result.is_err());
    }
}
