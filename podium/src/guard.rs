//! AsyncGuard - reference-counted tracker for in-flight operations.
//!
//! Acquiring a token increments an atomic counter and fires the change
//! notification; dropping the token decrements and fires again. The
//! notification fires on every increment and decrement, not only on
//! zero-crossings, so consumers that only care about the zero-crossing can
//! check `is_ongoing` in their handler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::event::Notifier;

struct GuardInner {
    count: AtomicUsize,
    changed: Notifier<bool>,
}

impl GuardInner {
    fn fire(&self) {
        self.changed.notify(&(self.count.load(Ordering::SeqCst) != 0));
    }
}

/// Tracks how many operations are currently in flight.
pub struct AsyncGuard {
    inner: Arc<GuardInner>,
}

impl AsyncGuard {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GuardInner {
                count: AtomicUsize::new(0),
                changed: Notifier::new(),
            }),
        }
    }

    /// True while at least one token is alive.
    pub fn is_ongoing(&self) -> bool {
        self.inner.count.load(Ordering::SeqCst) != 0
    }

    /// Acquire a token for the duration of an operation.
    pub fn token(&self) -> OngoingToken {
        self.inner.count.fetch_add(1, Ordering::SeqCst);
        self.inner.fire();
        OngoingToken {
            inner: self.inner.clone(),
        }
    }

    /// Subscribe to count changes. The handler receives the current
    /// `is_ongoing` value after each increment or decrement.
    pub fn on_changed<F>(&self, handler: F)
    where
        F: Fn(&bool) + Send + Sync + 'static,
    {
        self.inner.changed.subscribe(handler);
    }
}

impl Default for AsyncGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope token returned by [`AsyncGuard::token`]; the operation counts as
/// in flight until this is dropped.
pub struct OngoingToken {
    inner: Arc<GuardInner>,
}

impl Drop for OngoingToken {
    fn drop(&mut self) {
        self.inner.count.fetch_sub(1, Ordering::SeqCst);
        self.inner.fire();
    }
}
