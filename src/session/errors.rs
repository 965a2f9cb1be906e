use std::fmt;

/// A single client-side validation failure tied to a form field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Collected validation failures for one submission.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Converts the collected failures into a result, `Ok` when nothing was recorded.
    /// # Errors
    /// Returns `SessionError::Validation` when at least one field failed.
    pub fn into_result(self) -> Result<(), SessionError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(SessionError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(formatter, "{}", messages.join("; "))
    }
}

#[derive(Clone, Debug)]
pub enum SessionError {
    Validation(ValidationErrors),
    Unauthorized { message: String },
    Http { status: u16, message: String },
    Network(String),
    Timeout(String),
    Parse(String),
    Serialization(String),
    Storage(String),
    Config(String),
}

impl SessionError {
    /// True when the backend rejected the session (HTTP 401).
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// True when no response was received at all, including timeouts.
    /// Use `matches!(err, SessionError::Timeout(_))` to tell the two apart.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// HTTP status of a server-side rejection.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The user-facing message without the category prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Validation(errors) => errors.to_string(),
            Self::Unauthorized { message } | Self::Http { message, .. } => message.clone(),
            Self::Network(message)
            | Self::Timeout(message)
            | Self::Parse(message)
            | Self::Serialization(message)
            | Self::Storage(message)
            | Self::Config(message) => message.clone(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Validation(errors) => write!(formatter, "Invalid input: {errors}"),
            SessionError::Unauthorized { message } => {
                write!(formatter, "Unauthorized: {message}")
            }
            SessionError::Http { status, message } => {
                write!(formatter, "Request failed ({status}): {message}")
            }
            SessionError::Network(message) => write!(formatter, "Network error: {message}"),
            SessionError::Timeout(message) => write!(formatter, "Timeout: {message}"),
            SessionError::Parse(message) => write!(formatter, "Response error: {message}"),
            SessionError::Serialization(message) => {
                write!(formatter, "Request error: {message}")
            }
            SessionError::Storage(message) => write!(formatter, "Storage error: {message}"),
            SessionError::Config(message) => write!(formatter, "Config error: {message}"),
        }
    }
}

impl std::error::Error for SessionError {}
