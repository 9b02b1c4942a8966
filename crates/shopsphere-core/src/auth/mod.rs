//! Authentication module for the storefront session.
//!
//! This module provides:
//! - `AuthenticationService`: single-flight login state machine
//! - `Authenticator`: the backend seam it calls (implemented by `ApiGateway`)
//! - `Credentials`, `RegistrationForm`: transient request inputs
//!
//! Credentials are never stored; the resulting token lives in `SessionStore`.

pub mod credentials;
pub mod error;
pub mod service;

pub use credentials::{Credentials, RegistrationForm};
pub use error::LoginError;
pub use service::{AuthenticationService, Authenticator, DEFAULT_LOGIN_TIMEOUT};
