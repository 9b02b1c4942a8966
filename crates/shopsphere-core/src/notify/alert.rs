use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Identifier of an alert, unique within one `NotificationCenter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertId(pub(crate) u64);

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A short-lived, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub id: AlertId,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub(crate) expires_at: Instant,
}

impl Alert {
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Published by the notification center whenever its queue changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertEvent {
    Raised(Alert),
    Dismissed(AlertId),
}
