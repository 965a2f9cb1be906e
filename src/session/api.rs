//! HTTP transport for the portal API with a single `reqwest::Client`, a fixed
//! timeout policy and consistent error classification.
//!
//! Request flow, as driven by `SessionClient::call`:
//! - `ApiTransport::request` builds the request against the configured base URL.
//! - `attach_bearer` adds `Authorization: Bearer <token>` when a token is held.
//! - `ApiTransport::dispatch` sends it; transport failures become `Network` or `Timeout`.
//! - the client observes the status (401 clears the session).
//! - `decode` turns the body into the typed payload or a classified error.
//!
//! The transport stores no session state and never logs headers or bodies.

use super::{config::ClientConfig, errors::SessionError};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info_span, Instrument};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Maximum number of error body characters surfaced to callers.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct ApiTransport {
    client: Client,
    base_url: Url,
}

impl ApiTransport {
    /// Builds the shared HTTP client from the configuration.
    /// # Errors
    /// Returns `SessionError::Config` if the base URL is invalid or the client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, SessionError> {
        let base_url = config.base_url()?;
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.timeout.min(CONNECT_TIMEOUT))
            .timeout(config.timeout)
            .build()
            .map_err(|err| SessionError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins `path` onto the base URL, appending `param` as one percent-encoded segment.
    /// # Errors
    /// Returns `SessionError::Config` if the base URL cannot carry a path.
    pub fn endpoint(&self, path: &str, param: Option<&str>) -> Result<Url, SessionError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                SessionError::Config(format!("API base URL cannot be a base: {}", self.base_url))
            })?;
            segments
                .pop_if_empty()
                .extend(path.split('/').filter(|segment| !segment.is_empty()));
            if let Some(param) = param {
                segments.push(param);
            }
        }
        Ok(url)
    }

    /// # Errors
    /// Returns `SessionError::Config` if the endpoint URL cannot be built.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        param: Option<&str>,
    ) -> Result<RequestBuilder, SessionError> {
        let url = self.endpoint(path, param)?;
        Ok(self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    /// Sends a request. `route` is the path template used for tracing so
    /// path parameters such as reset tokens never reach the logs.
    /// # Errors
    /// Returns `Network`, `Timeout` or `Serialization` when no response is received.
    pub async fn dispatch(
        &self,
        route: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, SessionError> {
        let request = request.build().map_err(map_request_error)?;
        let span = info_span!(
            "portal.request",
            http.method = %request.method(),
            route = route
        );

        let response = self
            .client
            .execute(request)
            .instrument(span)
            .await
            .map_err(map_request_error)?;

        debug!("{route} -> {}", response.status());

        Ok(response)
    }
}

/// Outgoing middleware: attaches the bearer credential when one is held.
pub fn attach_bearer(request: RequestBuilder, token: Option<&SecretString>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token.expose_secret()),
        None => request,
    }
}

/// Maps transport errors into `SessionError` variants with timeout detection.
fn map_request_error(err: reqwest::Error) -> SessionError {
    if err.is_timeout() {
        SessionError::Timeout("Request timed out. Please try again.".to_string())
    } else if err.is_builder() {
        SessionError::Serialization(format!("Failed to build request: {err}"))
    } else {
        SessionError::Network(format!(
            "Unable to reach the server. Please check your connection. ({err})"
        ))
    }
}

/// Reads the body and decodes it, or classifies the failure.
/// `fallback` is the message used when the server gives no usable one.
/// # Errors
/// Returns `Unauthorized` for 401, `Http` for other non-success statuses, and
/// `Parse` when a success body does not match `T`.
pub async fn decode<T: DeserializeOwned>(
    response: Response,
    fallback: &str,
) -> Result<T, SessionError> {
    let status = response.status();
    let body = response.text().await.map_err(map_request_error)?;

    if status.is_success() {
        parse_body(&body)
    } else {
        Err(classify_status(status, &body, fallback))
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, SessionError> {
    let value = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body)
            .map_err(|err| SessionError::Parse(format!("Failed to decode response: {err}")))?
    };

    serde_json::from_value(value)
        .map_err(|err| SessionError::Parse(format!("Unexpected response shape: {err}")))
}

fn classify_status(status: StatusCode, body: &str, fallback: &str) -> SessionError {
    let message = error_message(body).unwrap_or_else(|| fallback.to_string());

    if status == StatusCode::UNAUTHORIZED {
        SessionError::Unauthorized { message }
    } else {
        SessionError::Http {
            status: status.as_u16(),
            message,
        }
    }
}

/// Prefers the server's `message`, then `error`, then a plain-text body.
fn error_message(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => ["message", "error"]
            .iter()
            .filter_map(|key| json.get(key).and_then(Value::as_str))
            .find_map(sanitize_body),
        Err(_) => sanitize_body(body),
    }
}

/// Trims and truncates text for user-facing messages; empty text yields `None`.
fn sanitize_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_ERROR_CHARS).collect())
    }
}
