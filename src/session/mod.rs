//! Session and authentication client for the portal API.
//!
//! ## Flows
//!
//! ### Login & Signup
//!
//! 1. **Validate:** credentials or the signup profile are checked locally; failures never reach the network.
//! 2. **Submit:** the client POSTs to `/api/auth/login` or `/api/auth/signup`.
//! 3. **Establish:** a token in the response is persisted and replaces any previous token.
//!
//! ### Password Reset
//!
//! 1. **Request:** `/api/auth/forgot-password` sends the email; the address is remembered as the reset-email hint.
//! 2. **Resend:** the hint lets the caller re-send the link without prompting again.
//! 3. **Reset:** `/api/auth/reset-password/{token}` sets the new password and forgets the hint.
//!
//! ### Session Check
//!
//! `/api/auth/me` confirms the held token. Without a token nothing is sent. Any
//! 401, from this or any other endpoint, clears the session and publishes
//! `SessionEvent::Expired`.
//!
//! Tokens and passwords are bearer secrets; nothing in this module logs them.

pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod store;
pub mod types;
pub mod validate;

pub use client::SessionClient;
pub use config::ClientConfig;
pub use errors::{FieldError, SessionError, ValidationErrors};
pub use events::SessionEvent;
pub use store::{FileStore, MemoryStore, SessionStore, StoreKey};
pub use types::{Acknowledgement, AuthResponse, Credentials, LoginOutcome, SignupProfile, UserRecord};
