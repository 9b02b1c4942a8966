//! Shop Sphere client core.
//!
//! The stateful part of the storefront client:
//!
//! - `session`: persisted session state and the store that owns it
//! - `auth`: the single-flight login state machine
//! - `api`: the bearer-token HTTP gateway every page calls through
//! - `notify`: transient user-facing alerts with automatic expiry
//! - `context`: the object created once at startup that wires them together

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod notify;
pub mod observer;
pub mod session;

mod utils;

#[cfg(test)]
mod test_support;

pub use api::{ApiError, ApiGateway};
pub use auth::{AuthenticationService, Authenticator, Credentials, LoginError, RegistrationForm};
pub use config::Config;
pub use context::ClientContext;
pub use notify::{Alert, AlertEvent, AlertId, NotificationCenter, Severity};
pub use observer::Subscription;
pub use session::{AuthStatus, PersistenceLayer, Profile, SessionState, SessionStore, Transition};
