use std::collections::VecDeque;
use std::sync::Mutex;

use tracing::{debug, info};

use super::persistence::PersistenceLayer;
use super::state::{SessionState, Transition};
use crate::observer::{Listeners, Subscription};
use crate::utils::lock;

/// Owner of the one mutable [`SessionState`].
///
/// Every accepted transition is saved through the [`PersistenceLayer`] before
/// subscribers hear about it, so a subscriber that reads storage always sees
/// the post-transition snapshot.
///
/// Notifications are delivered in the order the transitions were applied,
/// even when several threads dispatch at once. Accepted states are queued
/// under the same lock that applies them, and a single thread at a time
/// drains that queue. A dispatch made while another delivery is running
/// (including one made from inside a listener) is handed to that delivery.
pub struct SessionStore {
    inner: Mutex<Inner>,
    persistence: PersistenceLayer,
    listeners: Listeners<SessionState>,
}

struct Inner {
    state: SessionState,
    undelivered: VecDeque<SessionState>,
    delivering: bool,
}

/// Releases the delivery claim if a listener panics mid-delivery.
struct DeliveryGuard<'a> {
    store: &'a SessionStore,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            lock(&self.store.inner).delivering = false;
        }
    }
}

impl SessionStore {
    /// Create a store seeded from the persisted snapshot, or empty if there is none.
    pub fn open(persistence: PersistenceLayer) -> Self {
        let initial = match persistence.load() {
            Some(snapshot) => {
                debug!(status = %snapshot.status, "Restored session snapshot");
                snapshot.restored()
            }
            None => {
                debug!("No usable session snapshot, starting empty");
                SessionState::default()
            }
        };

        Self {
            inner: Mutex::new(Inner {
                state: initial,
                undelivered: VecDeque::new(),
                delivering: false,
            }),
            persistence,
            listeners: Listeners::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::open(PersistenceLayer::in_memory())
    }

    pub fn state(&self) -> SessionState {
        lock(&self.inner).state.clone()
    }

    /// Apply a transition and return the resulting state.
    ///
    /// Invalid transitions leave the state untouched and return it unchanged;
    /// nothing is persisted and no subscriber is called.
    pub fn dispatch(&self, transition: Transition) -> SessionState {
        let next = {
            let mut inner = lock(&self.inner);
            match inner.state.apply(&transition) {
                Some(next) => {
                    self.persistence.save(&next);
                    inner.state = next.clone();
                    inner.undelivered.push_back(next.clone());
                    next
                }
                None => {
                    debug!(
                        transition = transition.name(),
                        status = %inner.state.status,
                        "Ignoring transition"
                    );
                    return inner.state.clone();
                }
            }
        };

        match &transition {
            Transition::AuthFailed { reason } => {
                info!(reason = %reason, "Authentication failed")
            }
            other => debug!(transition = other.name(), status = %next.status, "Session updated"),
        }

        self.deliver();
        next
    }

    /// Publish queued states in order, unless another call is already doing so.
    fn deliver(&self) {
        {
            let mut inner = lock(&self.inner);
            if inner.delivering {
                return;
            }
            inner.delivering = true;
        }

        let _guard = DeliveryGuard { store: self };
        loop {
            let next = {
                let mut inner = lock(&self.inner);
                match inner.undelivered.pop_front() {
                    Some(next) => next,
                    None => {
                        inner.delivering = false;
                        return;
                    }
                }
            };
            self.listeners.publish(&next);
        }
    }

    /// Register a listener called with the new state after every accepted transition.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }
}
