//! REST gateway module for the storefront backend.
//!
//! This module provides the `ApiGateway` for issuing JSON requests with a
//! bearer token, and the `ApiError` taxonomy that separates transport
//! failures from HTTP-status failures.

pub mod client;
pub mod error;

pub use client::{ApiGateway, LOGIN_PATH, LOGOUT_PATH, PROFILE_PATH, SIGNUP_PATH};
pub use error::ApiError;
