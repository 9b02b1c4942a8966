//! Minimal observer registry used by the session store and notification center.
//!
//! Listeners are invoked synchronously, in registration order, on the thread
//! that publishes. The registry lock is released before any listener runs, so
//! a listener may subscribe, unsubscribe or publish again without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::utils::lock;

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;
type Entries<E> = Mutex<Vec<(u64, Callback<E>)>>;

pub(crate) struct Listeners<E> {
    entries: Arc<Entries<E>>,
    next_id: AtomicU64,
}

impl<E: 'static> Listeners<E> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    pub(crate) fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.entries).push((id, Arc::new(listener)));

        let entries: Weak<Entries<E>> = Arc::downgrade(&self.entries);
        Subscription {
            cancel: Box::new(move || {
                if let Some(entries) = entries.upgrade() {
                    lock(&entries).retain(|(entry_id, _)| *entry_id != id);
                }
            }),
        }
    }

    pub(crate) fn publish(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = lock(&self.entries)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener registered;
/// call [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    cancel: Box<dyn FnOnce() + Send + Sync>,
}

impl Subscription {
    /// Remove the listener. Safe to call after the publisher is gone.
    pub fn unsubscribe(self) {
        (self.cancel)();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
