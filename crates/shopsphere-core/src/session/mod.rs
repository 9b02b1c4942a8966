//! Session state and its persistence.
//!
//! This module provides:
//! - `SessionState`: token, last authentication status, and cached profile
//! - `SessionStore`: the single owner of that state, mutated only by `dispatch`
//! - `PersistenceLayer`: best-effort write-through of every accepted transition
//!
//! The snapshot is stored as JSON under one fixed key (`applicationState`).

pub mod persistence;
pub mod state;
pub mod store;

pub use persistence::{FileStorage, MemoryStorage, PersistenceLayer, Storage, SESSION_KEY};
pub use state::{AuthStatus, Profile, SessionState, Transition};
pub use store::SessionStore;
