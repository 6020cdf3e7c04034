//! Event primitives: async multicast and synchronous notification.
//!
//! Lifecycle events (`Activated`, `Deactivating`, `Deactivated`,
//! `ActivationProcessed`) carry "await all subscribers" semantics: the raiser
//! does not proceed until every handler's future has completed. A plain
//! multicast with fire-and-forget delivery is not enough, so subscribers are
//! kept as an explicit list of async-capable observers invoked sequentially.
//!
//! `Notifier` is the synchronous sibling, used where notification has to fire
//! from non-async contexts (token drops, collection mutation).

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;

type AsyncHandler<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;
type SyncHandler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Asynchronous multicast event.
///
/// Handlers are invoked in subscription order and awaited one at a time;
/// `raise` returns only after the last handler completes.
pub struct AsyncEvent<T> {
    handlers: Mutex<Vec<AsyncHandler<T>>>,
}

impl<T: Clone + Send + 'static> AsyncEvent<T> {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe an async handler.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(T) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.handlers.lock().push(Arc::new(handler));
    }

    /// Subscribe a synchronous closure, wrapped as an immediately-ready
    /// async handler.
    pub fn subscribe_fn<F>(&self, handler: F)
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe(move |payload| {
            handler(payload);
            futures::future::ready(()).boxed()
        });
    }

    /// Raise the event, awaiting every subscriber before returning.
    pub async fn raise(&self, payload: T) {
        let handlers: Vec<AsyncHandler<T>> = self.handlers.lock().clone();
        for handler in handlers {
            handler(payload.clone()).await;
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }
}

impl<T: Clone + Send + 'static> Default for AsyncEvent<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous multicast notification.
pub struct Notifier<T> {
    handlers: Mutex<Vec<SyncHandler<T>>>,
}

impl<T> Notifier<T> {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.handlers.lock().push(Arc::new(handler));
    }

    pub fn notify(&self, payload: &T) {
        let handlers: Vec<SyncHandler<T>> = self.handlers.lock().clone();
        for handler in handlers {
            handler(payload);
        }
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}
