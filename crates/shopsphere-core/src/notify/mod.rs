//! User-facing notification queue.
//!
//! `NotificationCenter::notify` appends an `Alert` that disappears on its own
//! after a fixed delay (3000ms by default) unless dismissed first. Listeners
//! registered with `subscribe` see every `AlertEvent`.

pub mod alert;
pub mod center;

pub use alert::{Alert, AlertEvent, AlertId, Severity};
pub use center::{NotificationCenter, DEFAULT_ALERT_TTL};
