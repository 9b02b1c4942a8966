use serde::{Deserialize, Serialize};

/// Outcome of the most recent authentication attempt.
///
/// This says nothing about whether the current token is still accepted by
/// the server; only a response to an authorized call can tell that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    #[default]
    #[serde(alias = "unknown")]
    Idle,
    Pending,
    Success,
    Failed,
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthStatus::Idle => write!(f, "idle"),
            AuthStatus::Pending => write!(f, "pending"),
            AuthStatus::Success => write!(f, "success"),
            AuthStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Cached identity data returned by `GET /profile`.
///
/// The server names these `name`, `surname` and `profile_img`; the aliases
/// accept that shape while snapshots keep the field names below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, alias = "name")]
    pub first_name: String,
    #[serde(default, alias = "surname")]
    pub last_name: String,
    pub email: String,
    #[serde(default, rename = "image_src", alias = "profile_img")]
    pub image: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// The canonical session state. Also the exact shape of the persisted snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Bearer token; empty means unauthenticated.
    pub token: String,
    pub status: AuthStatus,
    #[serde(default)]
    pub profile: Option<Profile>,
}

/// A requested change to [`SessionState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    AuthPending,
    AuthSucceeded {
        token: String,
        profile: Option<Profile>,
    },
    AuthFailed {
        reason: String,
    },
    /// Clear token and profile and return to `Idle`.
    Invalidate,
    ProfileLoaded(Profile),
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::AuthPending => "AuthPending",
            Transition::AuthSucceeded { .. } => "AuthSucceeded",
            Transition::AuthFailed { .. } => "AuthFailed",
            Transition::Invalidate => "Invalidate",
            Transition::ProfileLoaded(_) => "ProfileLoaded",
        }
    }
}

impl SessionState {
    /// True when a token is held. The token may still be rejected by the server.
    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }

    /// The cached profile, but only while a token is held.
    pub fn trusted_profile(&self) -> Option<&Profile> {
        if self.is_authenticated() {
            self.profile.as_ref()
        } else {
            None
        }
    }

    /// Compute the state that follows `transition`.
    ///
    /// Returns `None` when the transition is not valid from the current state
    /// or would leave it unchanged.
    pub fn apply(&self, transition: &Transition) -> Option<SessionState> {
        let next = match transition {
            Transition::AuthPending => {
                if self.status == AuthStatus::Pending {
                    return None;
                }
                SessionState {
                    status: AuthStatus::Pending,
                    ..self.clone()
                }
            }
            Transition::AuthSucceeded { token, profile } => {
                if self.status != AuthStatus::Pending || token.is_empty() {
                    return None;
                }
                // A new token invalidates whatever profile was cached for the old one.
                SessionState {
                    token: token.clone(),
                    status: AuthStatus::Success,
                    profile: profile.clone(),
                }
            }
            Transition::AuthFailed { .. } => {
                if self.status != AuthStatus::Pending {
                    return None;
                }
                // Failed re-authentication keeps an existing session intact.
                SessionState {
                    status: AuthStatus::Failed,
                    ..self.clone()
                }
            }
            Transition::Invalidate => SessionState::default(),
            Transition::ProfileLoaded(profile) => {
                if !self.is_authenticated() {
                    return None;
                }
                SessionState {
                    profile: Some(profile.clone()),
                    ..self.clone()
                }
            }
        };

        if next == *self {
            None
        } else {
            Some(next)
        }
    }

    /// Normalize a snapshot restored at startup. A `Pending` status cannot be
    /// resumed because the attempt that set it died with the previous process.
    pub(crate) fn restored(mut self) -> Self {
        if self.status == AuthStatus::Pending {
            self.status = AuthStatus::Idle;
        }
        self
    }
}
