//! Small helpers shared by the stateful components.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the inner value if a previous holder panicked.
///
/// Every mutation in this crate is applied in one step under the lock, so a
/// poisoned guard never exposes a half-applied state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
