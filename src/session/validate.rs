//! Client-side checks run before any request leaves the process. A failure here
//! never reaches the network. The rules mirror what the portal forms enforce so
//! the backend sees the same inputs it always has.

use super::{
    errors::{SessionError, ValidationErrors},
    types::{Credentials, SignupProfile},
};
use regex::Regex;
use secrecy::ExposeSecret;

const MIN_PASSWORD_CHARS: usize = 6;
const MIN_NAME_CHARS: usize = 2;

/// Basic email format check.
#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").is_ok_and(|regex| regex.is_match(email))
}

/// Phone numbers are 10 to 15 digits with an optional leading `+`; whitespace is ignored.
#[must_use]
pub fn valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    Regex::new(r"^[+]?[0-9]{10,15}$").is_ok_and(|regex| regex.is_match(&compact))
}

/// A strong password has at least one uppercase letter and one digit.
#[must_use]
pub fn strong_password(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_uppercase()) && password.chars().any(|c| c.is_ascii_digit())
}

fn check_email(errors: &mut ValidationErrors, email: &str) {
    let email = email.trim();
    if email.is_empty() {
        errors.push("email", "Email is required");
    } else if !valid_email(email) {
        errors.push("email", "Please enter a valid email address");
    }
}

fn check_password(errors: &mut ValidationErrors, password: &str, require_strength: bool) {
    if password.is_empty() {
        errors.push("password", "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_CHARS {
        errors.push("password", "Password must be at least 6 characters");
    } else if require_strength && !strong_password(password) {
        errors.push(
            "password",
            "Password must contain at least one uppercase letter and one number",
        );
    }
}

fn check_confirmation(errors: &mut ValidationErrors, password: &str, confirmation: &str) {
    if confirmation.is_empty() {
        errors.push("confirmPassword", "Please confirm your password");
    } else if password != confirmation {
        errors.push("confirmPassword", "Passwords do not match");
    }
}

/// # Errors
/// Returns `SessionError::Validation` if the email is missing or malformed.
pub fn validate_email(email: &str) -> Result<(), SessionError> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, email);
    errors.into_result()
}

/// Login only checks presence, format and minimum length.
/// # Errors
/// Returns `SessionError::Validation` listing every failing field.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), SessionError> {
    let mut errors = ValidationErrors::new();
    check_email(&mut errors, &credentials.email);
    check_password(&mut errors, credentials.password.expose_secret(), false);
    errors.into_result()
}

/// # Errors
/// Returns `SessionError::Validation` listing every failing field.
pub fn validate_signup(profile: &SignupProfile) -> Result<(), SessionError> {
    let mut errors = ValidationErrors::new();

    let name = profile.name.trim();
    if name.is_empty() {
        errors.push("name", "Full name is required");
    } else if name.chars().count() < MIN_NAME_CHARS {
        errors.push("name", "Name must be at least 2 characters");
    }

    check_email(&mut errors, &profile.email);

    let password = profile.password.expose_secret();
    check_password(&mut errors, password, true);
    check_confirmation(&mut errors, password, profile.confirm_password.expose_secret());

    if profile.phone.trim().is_empty() {
        errors.push("phone", "Phone number is required");
    } else if !valid_phone(&profile.phone) {
        errors.push("phone", "Please enter a valid phone number");
    }

    if profile.company_name.trim().is_empty() {
        errors.push("companyName", "Company/Institution name is required");
    }

    if profile.address.trim().is_empty() {
        errors.push("address", "Address is required");
    }

    if !profile.agree_terms {
        errors.push("agreeTerms", "You must agree to the terms and conditions");
    }

    errors.into_result()
}

/// # Errors
/// Returns `SessionError::Validation` when the reset token is empty, the password
/// is weak, or the confirmation does not match.
pub fn validate_reset(
    reset_token: &str,
    password: &str,
    confirmation: &str,
) -> Result<(), SessionError> {
    let mut errors = ValidationErrors::new();
    if reset_token.trim().is_empty() {
        errors.push("token", "Reset link is missing its token");
    }
    check_password(&mut errors, password, true);
    check_confirmation(&mut errors, password, confirmation);
    errors.into_result()
}
