//! Transient notification queue with time-based expiry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::alert::{Alert, AlertEvent, AlertId, Severity};
use crate::observer::{Listeners, Subscription};
use crate::utils::lock;

/// How long an alert stays visible unless dismissed.
pub const DEFAULT_ALERT_TTL: Duration = Duration::from_millis(3000);

#[derive(Default)]
struct Queue {
    alerts: Vec<Alert>,
    timers: HashMap<AlertId, JoinHandle<()>>,
}

struct Inner {
    ttl: Duration,
    next_id: AtomicU64,
    queue: Mutex<Queue>,
    listeners: Listeners<AlertEvent>,
}

/// Ordered collection of alerts, each removed automatically after the TTL.
///
/// Independent of the session components: anything may raise an alert and
/// nothing depends on one being shown. Clone is cheap and shares the queue.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<Inner>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_ALERT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl,
                next_id: AtomicU64::new(1),
                queue: Mutex::new(Queue::default()),
                listeners: Listeners::new(),
            }),
        }
    }

    /// Append an alert and schedule its removal after the TTL.
    ///
    /// Identical messages are never merged. Outside a Tokio runtime no timer
    /// is spawned; the alert still expires on the next `list`.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) -> AlertId {
        let id = AlertId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let alert = Alert {
            id,
            message: message.into(),
            severity,
            created_at: Utc::now(),
            expires_at: Instant::now() + self.inner.ttl,
        };
        debug!(id = %id, severity = %severity, message = %alert.message, "Alert raised");

        {
            let mut queue = lock(&self.inner.queue);
            queue.alerts.push(alert.clone());
            if let Some(timer) = self.schedule_expiry(id, alert.expires_at) {
                queue.timers.insert(id, timer);
            }
        }

        self.inner.listeners.publish(&AlertEvent::Raised(alert));
        id
    }

    fn schedule_expiry(&self, id: AlertId, deadline: Instant) -> Option<JoinHandle<()>> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Some(handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                trace!(id = %id, "Alert expired");
                NotificationCenter { inner }.remove(id, false);
            }
        }))
    }

    /// Remove an alert and cancel its scheduled expiry. Unknown ids are ignored.
    pub fn dismiss(&self, id: AlertId) {
        self.remove(id, true);
    }

    fn remove(&self, id: AlertId, cancel_timer: bool) {
        let removed = {
            let mut queue = lock(&self.inner.queue);
            let timer = queue.timers.remove(&id);
            if cancel_timer {
                if let Some(timer) = timer {
                    timer.abort();
                }
            }
            let before = queue.alerts.len();
            queue.alerts.retain(|a| a.id != id);
            queue.alerts.len() != before
        };

        if removed {
            self.inner.listeners.publish(&AlertEvent::Dismissed(id));
        }
    }

    /// Live alerts in insertion order. Anything past its deadline is dropped first.
    pub fn list(&self) -> Vec<Alert> {
        let now = Instant::now();
        let (alerts, expired) = {
            let mut queue = lock(&self.inner.queue);
            let expired: Vec<AlertId> = queue
                .alerts
                .iter()
                .filter(|a| a.is_expired(now))
                .map(|a| a.id)
                .collect();
            for id in &expired {
                if let Some(timer) = queue.timers.remove(id) {
                    timer.abort();
                }
            }
            queue.alerts.retain(|a| !a.is_expired(now));
            (queue.alerts.clone(), expired)
        };

        for id in expired {
            self.inner.listeners.publish(&AlertEvent::Dismissed(id));
        }
        alerts
    }

    /// Register a listener for raised and dismissed alerts.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AlertEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(listener)
    }

    #[cfg(test)]
    fn scheduled(&self) -> usize {
        lock(&self.inner.queue).timers.len()
    }
}
