//! Request and response types for the portal auth API. Passwords are held as
//! `SecretString` and only exposed while building the wire payload, so these
//! types are safe to `Debug`-print but the wire structs must never be logged.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Email and password for a login attempt. Never persisted.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Full registration form. `agree_terms` is checked locally and never sent.
#[derive(Clone, Debug)]
pub struct SignupProfile {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
    pub phone: String,
    pub company_name: String,
    pub address: String,
    pub agree_terms: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignupRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
    pub phone: &'a str,
    pub company_name: &'a str,
    pub address: &'a str,
}

impl<'a> From<&'a SignupProfile> for SignupRequest<'a> {
    fn from(profile: &'a SignupProfile) -> Self {
        Self {
            name: profile.name.trim(),
            email: profile.email.trim(),
            password: profile.password.expose_secret(),
            confirm_password: profile.confirm_password.expose_secret(),
            phone: profile.phone.trim(),
            company_name: profile.company_name.trim(),
            address: profile.address.trim(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> From<&'a Credentials> for LoginRequest<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            email: credentials.email.trim(),
            password: credentials.password.expose_secret(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct EmailRequest<'a> {
    pub email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResetPasswordRequest<'a> {
    pub password: &'a str,
    pub confirm_password: &'a str,
}

/// The backend's user object. Its shape is server-defined, so it is kept as
/// JSON with accessors for the fields the portal displays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRecord(Value);

impl UserRecord {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// The user id rendered as a string, whether the backend sends a number or a string.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        let id = self.0.get("id").or_else(|| self.0.get("_id"))?;
        match id {
            Value::String(value) => Some(value.clone()),
            Value::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }
}

/// Body returned by signup and login.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserRecord>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthResponse {
    /// The issued token, ignoring empty strings.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.is_empty())
    }
}

/// Body returned by `/api/auth/me`.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct MeResponse {
    pub user: UserRecord,
}

/// Result of a login call as reported to the caller.
#[derive(Clone, Debug)]
pub struct LoginOutcome {
    pub authenticated: bool,
    pub message: String,
    pub user: Option<UserRecord>,
}

/// Server-defined acknowledgement for the password and verification endpoints.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Acknowledgement(Value);

impl Acknowledgement {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.0.get("message").and_then(Value::as_str)
    }
}
