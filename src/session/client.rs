//! The session client: one explicit, cloneable handle that owns the HTTP
//! transport, the in-memory session and the durable store. Every auth call goes
//! through `SessionClient::call`, which runs the middleware steps in order so
//! token attachment and 401 handling are visible at a single place.
//!
//! Lifecycle: `new` reads the persisted token, `restore` confirms it with the
//! backend, login/signup replace it, logout or any 401 clears it.

use super::{
    api::{attach_bearer, decode, ApiTransport},
    config::ClientConfig,
    errors::{SessionError, ValidationErrors},
    events::{EventBus, SessionEvent},
    store::{SessionStore, StoreKey},
    types::{
        Acknowledgement, AuthResponse, Credentials, EmailRequest, LoginOutcome, LoginRequest,
        MeResponse, ResetPasswordRequest, SignupProfile, SignupRequest, UserRecord,
    },
    validate,
};
use reqwest::{Method, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

pub const SIGNUP_PATH: &str = "/api/auth/signup";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const FORGOT_PASSWORD_PATH: &str = "/api/auth/forgot-password";
pub const RESET_PASSWORD_PATH: &str = "/api/auth/reset-password";
pub const RESEND_VERIFICATION_PATH: &str = "/api/auth/resend-verification";
pub const ME_PATH: &str = "/api/auth/me";

/// In-memory half of the session. The token mirrors the store; the state lock
/// is held across every token write to the store so the two cannot diverge.
#[derive(Default)]
struct SessionState {
    token: Option<SecretString>,
    user: Option<UserRecord>,
}

impl SessionState {
    /// Whether a response to a request made under `held` may still act on
    /// this session. Once the token has been replaced it may not.
    fn belongs_to(&self, held: Option<&SecretString>) -> bool {
        match (self.token.as_ref(), held) {
            (None, _) => true,
            (Some(current), Some(held)) => current.expose_secret() == held.expose_secret(),
            (Some(_), None) => false,
        }
    }
}

struct Inner {
    transport: ApiTransport,
    store: Arc<dyn SessionStore>,
    state: Mutex<SessionState>,
    events: EventBus,
}

#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SessionClient")
            .field("base_url", &self.inner.transport.base_url().as_str())
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl SessionClient {
    /// Builds the client and loads any persisted token into memory.
    /// # Errors
    /// Returns `Config` for an invalid base URL and `Storage` if the store cannot be read.
    pub fn new(config: &ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self, SessionError> {
        let transport = ApiTransport::new(config)?;
        let token = store
            .get(StoreKey::Token)?
            .filter(|token| !token.is_empty())
            .map(SecretString::from);

        debug!(
            "session client for {} (persisted token: {})",
            transport.base_url(),
            token.is_some()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                store,
                state: Mutex::new(SessionState { token, user: None }),
                events: EventBus::new(),
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Receives sign-in, sign-out and expiry notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().token.is_some()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserRecord> {
        self.state().user.clone()
    }

    /// The token currently attached to requests.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.state().token.clone()
    }

    /// Email remembered by the last successful forgot-password request.
    /// # Errors
    /// Returns `SessionError::Storage` if the store cannot be read.
    pub fn reset_email_hint(&self) -> Result<Option<String>, SessionError> {
        self.inner.store.get(StoreKey::ResetEmail)
    }

    /// Credential-issuing endpoints are called without the current token.
    fn takes_bearer(route: &str) -> bool {
        !matches!(route, SIGNUP_PATH | LOGIN_PATH | FORGOT_PASSWORD_PATH)
    }

    /// Runs one request through the middleware chain under the token held now.
    async fn call<B, T>(
        &self,
        method: Method,
        route: &'static str,
        param: Option<&str>,
        body: Option<&B>,
        fallback: &str,
    ) -> Result<T, SessionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let held = self.token();
        self.call_as(held.as_ref(), method, route, param, body, fallback)
            .await
    }

    /// Attach token, send, observe 401, decode. `held` is the session the
    /// request is made under; a 401 only ends that session, never a newer one.
    async fn call_as<B, T>(
        &self,
        held: Option<&SecretString>,
        method: Method,
        route: &'static str,
        param: Option<&str>,
        body: Option<&B>,
        fallback: &str,
    ) -> Result<T, SessionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bearer = held.filter(|_| Self::takes_bearer(route));
        let mut request = self.inner.transport.request(method, route, param)?;
        request = attach_bearer(request, bearer);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self.inner.transport.dispatch(route, request).await?;
        self.observe_response(&response, held);

        decode(response, fallback).await
    }

    /// Incoming middleware: a 401 from any endpoint ends the session it was made under.
    fn observe_response(&self, response: &Response, held: Option<&SecretString>) {
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("backend rejected the session (401)");
            if let Err(err) = self.release(held, false) {
                warn!("failed to clear persisted token: {err}");
            }
        }
    }

    /// Replaces the current session with a freshly issued token.
    fn establish(&self, token: &str, user: Option<UserRecord>) -> Result<(), SessionError> {
        {
            let mut state = self.state();
            self.inner.store.set(StoreKey::Token, token)?;
            state.token = Some(SecretString::from(token.to_string()));
            state.user = user.clone();
        }
        self.inner.events.publish(SessionEvent::SignedIn { user });
        Ok(())
    }

    /// Ends the session `held` if it is still current, publishing `Expired`
    /// when a token was actually dropped. Returns whether one was.
    fn release(
        &self,
        held: Option<&SecretString>,
        forget_hint: bool,
    ) -> Result<bool, SessionError> {
        let (dropped, result) = {
            let mut state = self.state();
            if !state.belongs_to(held) {
                debug!("session was replaced while the request was in flight, keeping it");
                return Ok(false);
            }
            let dropped = state.token.take().is_some();
            state.user = None;

            let token = self.inner.store.remove(StoreKey::Token);
            let hint = if forget_hint {
                self.inner.store.remove(StoreKey::ResetEmail)
            } else {
                Ok(())
            };
            (dropped, token.and(hint))
        };

        if dropped {
            info!("session ended, clearing token");
            self.inner.events.publish(SessionEvent::Expired);
        }
        result.map(|()| dropped)
    }

    /// Drops token, hint and user unconditionally.
    fn clear_session(&self) -> Result<(), SessionError> {
        let mut state = self.state();
        state.token = None;
        state.user = None;
        let token = self.inner.store.remove(StoreKey::Token);
        let hint = self.inner.store.remove(StoreKey::ResetEmail);
        token.and(hint)
    }

    /// Registers a new account; a returned token starts a session.
    /// # Errors
    /// Returns `Validation` before any request for an invalid profile, or the
    /// classified request failure.
    #[instrument(skip_all)]
    pub async fn signup(&self, profile: &SignupProfile) -> Result<AuthResponse, SessionError> {
        validate::validate_signup(profile)?;

        let request = SignupRequest::from(profile);
        let response: AuthResponse = self
            .call(Method::POST, SIGNUP_PATH, None, Some(&request), "Signup failed")
            .await?;

        if let Some(token) = response.token() {
            self.establish(token, response.user.clone())?;
            info!("signup succeeded, session established");
        } else {
            info!("signup succeeded without a session token");
        }

        Ok(response)
    }

    /// Logs in with email and password.
    /// # Errors
    /// Returns `Validation` before any request for malformed credentials, or the
    /// classified request failure. Nothing is persisted on failure.
    #[instrument(skip_all)]
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, SessionError> {
        validate::validate_credentials(credentials)?;

        let request = LoginRequest::from(credentials);
        let response: AuthResponse = self
            .call(Method::POST, LOGIN_PATH, None, Some(&request), "Invalid credentials")
            .await?;

        let Some(token) = response.token() else {
            info!("login response carried no token");
            return Ok(LoginOutcome {
                authenticated: false,
                message: response
                    .message
                    .unwrap_or_else(|| "Login did not return a session".to_string()),
                user: response.user,
            });
        };

        self.establish(token, response.user.clone())?;
        info!("login succeeded");

        Ok(LoginOutcome {
            authenticated: true,
            message: response
                .message
                .unwrap_or_else(|| "Login successful".to_string()),
            user: response.user,
        })
    }

    /// Ends the session locally. No request is made; the in-memory session is
    /// cleared even if the store cannot be updated.
    /// # Errors
    /// Returns `SessionError::Storage` if the persisted values cannot be removed.
    pub fn logout(&self) -> Result<(), SessionError> {
        let result = self.clear_session();
        self.inner.events.publish(SessionEvent::SignedOut);
        info!("logged out");
        result
    }

    /// Requests a password reset email and remembers the address for resends.
    /// # Errors
    /// Returns `Validation` for a malformed email, or the classified request failure.
    #[instrument(skip_all)]
    pub async fn forgot_password(&self, email: &str) -> Result<Acknowledgement, SessionError> {
        validate::validate_email(email)?;
        let email = email.trim();

        let ack: Acknowledgement = self
            .call(
                Method::POST,
                FORGOT_PASSWORD_PATH,
                None,
                Some(&EmailRequest { email }),
                "Failed to send reset email",
            )
            .await?;

        self.inner.store.set(StoreKey::ResetEmail, email)?;

        Ok(ack)
    }

    /// Re-sends the reset email to the remembered address.
    /// # Errors
    /// Returns `Validation` when no address is remembered, otherwise as `forgot_password`.
    pub async fn resend_reset_link(&self) -> Result<Acknowledgement, SessionError> {
        let Some(email) = self.reset_email_hint()? else {
            let mut errors = ValidationErrors::new();
            errors.push(
                "email",
                "Please request a new password reset from the sign-in page.",
            );
            return Err(SessionError::Validation(errors));
        };
        self.forgot_password(&email).await
    }

    /// Sets a new password using the token from the reset link.
    /// # Errors
    /// Returns `Validation` before any request when the confirmation differs or
    /// the password is weak, or the classified request failure.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        reset_token: &str,
        password: &SecretString,
        confirmation: &SecretString,
    ) -> Result<Acknowledgement, SessionError> {
        let password = password.expose_secret();
        let confirmation = confirmation.expose_secret();
        validate::validate_reset(reset_token, password, confirmation)?;

        let body = ResetPasswordRequest {
            password,
            confirm_password: confirmation,
        };
        let ack: Acknowledgement = self
            .call(
                Method::POST,
                RESET_PASSWORD_PATH,
                Some(reset_token.trim()),
                Some(&body),
                "Failed to reset password",
            )
            .await?;

        self.inner.store.remove(StoreKey::ResetEmail)?;

        Ok(ack)
    }

    /// Asks the backend to send another verification email.
    /// # Errors
    /// Returns `Validation` for a malformed email, or the classified request failure.
    #[instrument(skip_all)]
    pub async fn resend_verification_email(
        &self,
        email: &str,
    ) -> Result<Acknowledgement, SessionError> {
        validate::validate_email(email)?;

        self.call(
            Method::POST,
            RESEND_VERIFICATION_PATH,
            None,
            Some(&EmailRequest {
                email: email.trim(),
            }),
            "Failed to resend verification email",
        )
        .await
    }

    /// Confirms the held token with the backend. Never fails: without a token
    /// no request is made, and any failure clears the session and yields `None`.
    /// A session that replaced the checked one while the request was in flight
    /// is left alone.
    #[instrument(skip_all)]
    pub async fn check_session(&self) -> Option<UserRecord> {
        let Some(held) = self.token() else {
            self.state().user = None;
            return None;
        };

        match self
            .call_as::<(), MeResponse>(
                Some(&held),
                Method::GET,
                ME_PATH,
                None,
                None,
                "Session check failed",
            )
            .await
        {
            Ok(me) => {
                let mut state = self.state();
                if state.belongs_to(Some(&held)) && state.token.is_some() {
                    state.user = Some(me.user.clone());
                    Some(me.user)
                } else {
                    None
                }
            }
            Err(err) => {
                debug!("session check failed: {err}");
                if let Err(err) = self.release(Some(&held), true) {
                    warn!("failed to clear persisted session: {err}");
                }
                None
            }
        }
    }

    /// Startup hydration: reload the persisted token and confirm it.
    pub async fn restore(&self) -> Option<UserRecord> {
        match self.inner.store.get(StoreKey::Token) {
            Ok(token) => {
                self.state().token = token.filter(|t| !t.is_empty()).map(SecretString::from);
            }
            Err(err) => warn!("failed to read persisted token: {err}"),
        }
        self.check_session().await
    }
}
