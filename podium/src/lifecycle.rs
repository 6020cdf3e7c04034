//! Lifecycle - the per-screen state machine core.
//!
//! Every screen embeds one `Lifecycle`. It records the settled state
//! (`is_initialized`, `is_active`), the display name and parent link, and the
//! in-flight transition bookkeeping for the cooperative dual-cancellation
//! race between activation and deactivation:
//!
//! - each in-flight transition holds a child `CancellationToken` and a
//!   completion signal other transitions can await;
//! - a new transition first requests cancellation of the opposing in-flight
//!   transition, then awaits its completion signal before proceeding;
//! - no transition is ever torn down mid-flight; tokens are consulted only at
//!   the boundaries between discrete steps.
//!
//! The drivers that execute transitions live in [`crate::screen`]; this
//! module only hands out plans and bookkeeping scopes.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::event::AsyncEvent;
use crate::guard::AsyncGuard;
use crate::screen::CloseHost;

/// Process-unique identity of a screen's lifecycle.
///
/// Conductors de-duplicate and look up conducted items by this id; it never
/// leaves the process, so a monotonic counter is all that is needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenId(u64);

impl ScreenId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of the `Activated` event.
#[derive(Clone, Copy, Debug)]
pub struct ActivationEvent {
    /// Whether this activation also performed first-time initialization.
    pub was_initialized: bool,
}

/// Payload of the `Deactivating` and `Deactivated` events.
#[derive(Clone, Copy, Debug)]
pub struct DeactivationEvent {
    /// Whether this deactivation closes the screen.
    pub close: bool,
}

/// Completion signal one transition exposes so another can await its
/// synchronous portion finishing. Never left unresolved: a scope-exit guard
/// finishes it even when a hook errors.
#[derive(Clone)]
pub(crate) struct Completion {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl Completion {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    fn finish(&self) {
        let _ = self.tx.send(true);
    }

    pub(crate) async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}

struct Transition {
    cancel: CancellationToken,
    done: Completion,
}

struct State {
    is_initialized: bool,
    is_active: bool,
    initialization: Option<Completion>,
    activation: Option<Transition>,
    deactivation: Option<Transition>,
}

/// How an activation request should proceed.
pub(crate) enum ActivationPlan {
    /// Already active with nothing in flight.
    AlreadyActive,
    /// An activation is in flight; await it and return (coalesced).
    InFlight(Completion),
    /// Run the transition.
    Run {
        /// Token derived from the caller's; a later deactivation cancels it.
        cancel: CancellationToken,
        /// Completion of a deactivation that was in flight (already asked to
        /// cancel); must be awaited before proceeding.
        wait_deactivation: Option<Completion>,
        /// Whether first-time initialization is still pending.
        needs_init: bool,
    },
}

/// How a deactivation request should proceed.
pub(crate) enum DeactivationPlan {
    /// A deactivation is in flight; await it and return (coalesced).
    InFlight(Completion),
    /// Run the transition.
    Run {
        cancel: CancellationToken,
        /// In-flight initialization to defer behind (never skipped).
        wait_initialization: Option<Completion>,
    },
}

pub(crate) enum Phase {
    Activation,
    Deactivation,
}

/// The embeddable lifecycle state machine.
pub struct Lifecycle {
    id: ScreenId,
    display_name: Mutex<Option<String>>,
    state: Mutex<State>,
    busy: AsyncGuard,
    activated: AsyncEvent<ActivationEvent>,
    deactivating: AsyncEvent<DeactivationEvent>,
    deactivated: AsyncEvent<DeactivationEvent>,
    parent: Mutex<Option<Weak<dyn CloseHost>>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            id: ScreenId::next(),
            display_name: Mutex::new(None),
            state: Mutex::new(State {
                is_initialized: false,
                is_active: false,
                initialization: None,
                activation: None,
                deactivation: None,
            }),
            busy: AsyncGuard::new(),
            activated: AsyncEvent::new(),
            deactivating: AsyncEvent::new(),
            deactivated: AsyncEvent::new(),
            parent: Mutex::new(None),
        }
    }

    /// A lifecycle pre-named for display.
    pub fn named(name: impl Into<String>) -> Self {
        let lifecycle = Self::new();
        lifecycle.set_display_name(name);
        lifecycle
    }

    pub fn id(&self) -> ScreenId {
        self.id
    }

    /// Set true at most once; never reverts.
    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_initialized
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().is_active
    }

    pub fn display_name(&self) -> Option<String> {
        self.display_name.lock().clone()
    }

    pub fn set_display_name(&self, name: impl Into<String>) {
        *self.display_name.lock() = Some(name.into());
    }

    /// In-flight transition tracker; ongoing while any activation or
    /// deactivation is running.
    pub fn busy(&self) -> &AsyncGuard {
        &self.busy
    }

    /// Raised after a completed activation, awaiting all subscribers.
    pub fn activated(&self) -> &AsyncEvent<ActivationEvent> {
        &self.activated
    }

    /// Raised before the deactivation hook runs.
    pub fn deactivating(&self) -> &AsyncEvent<DeactivationEvent> {
        &self.deactivating
    }

    /// Raised after a completed deactivation.
    pub fn deactivated(&self) -> &AsyncEvent<DeactivationEvent> {
        &self.deactivated
    }

    /// Back-reference to the owning conductor. Never treated as ownership:
    /// the child link must not keep the parent alive.
    pub fn parent(&self) -> Option<Weak<dyn CloseHost>> {
        self.parent.lock().clone()
    }

    pub fn set_parent(&self, parent: Weak<dyn CloseHost>) {
        *self.parent.lock() = Some(parent);
    }

    pub fn clear_parent(&self) {
        *self.parent.lock() = None;
    }

    // ------------------------------------------------------------------
    // Transition bookkeeping (crate-internal, used by the screen drivers)
    // ------------------------------------------------------------------

    pub(crate) fn begin_activation(&self, token: &CancellationToken) -> ActivationPlan {
        let mut state = self.state.lock();
        if let Some(transition) = &state.activation {
            return ActivationPlan::InFlight(transition.done.clone());
        }
        if state.is_active && state.deactivation.is_none() {
            return ActivationPlan::AlreadyActive;
        }
        let cancel = token.child_token();
        let wait_deactivation = state.deactivation.as_ref().map(|transition| {
            transition.cancel.cancel();
            transition.done.clone()
        });
        let needs_init = !state.is_initialized;
        if needs_init && state.initialization.is_none() {
            state.initialization = Some(Completion::new());
        }
        state.activation = Some(Transition {
            cancel: cancel.clone(),
            done: Completion::new(),
        });
        ActivationPlan::Run {
            cancel,
            wait_deactivation,
            needs_init,
        }
    }

    pub(crate) fn begin_deactivation(&self, token: &CancellationToken) -> DeactivationPlan {
        let mut state = self.state.lock();
        if let Some(transition) = &state.deactivation {
            return DeactivationPlan::InFlight(transition.done.clone());
        }
        let cancel = token.child_token();
        let wait_initialization = if state.is_initialized {
            None
        } else {
            state.initialization.clone()
        };
        state.deactivation = Some(Transition {
            cancel: cancel.clone(),
            done: Completion::new(),
        });
        DeactivationPlan::Run {
            cancel,
            wait_initialization,
        }
    }

    /// Request cancellation of an in-flight activation and return its
    /// completion signal to await.
    pub(crate) fn interrupt_activation(&self) -> Option<Completion> {
        let state = self.state.lock();
        state.activation.as_ref().map(|transition| {
            transition.cancel.cancel();
            transition.done.clone()
        })
    }

    /// Whether the deactivate/deactivated sequence should run at all.
    pub(crate) fn should_deactivate(&self, close: bool) -> bool {
        let state = self.state.lock();
        state.is_active || (state.is_initialized && close)
    }

    pub(crate) fn mark_initialized(&self) {
        let completion = {
            let mut state = self.state.lock();
            state.is_initialized = true;
            state.initialization.take()
        };
        if let Some(completion) = completion {
            completion.finish();
        }
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.state.lock().is_active = active;
    }

    /// Scope guard completing an in-flight transition's bookkeeping on exit,
    /// hook errors included.
    pub(crate) fn transition_scope(&self, phase: Phase) -> TransitionScope<'_> {
        TransitionScope {
            lifecycle: self,
            phase,
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Lifecycle")
            .field("id", &self.id)
            .field("is_initialized", &state.is_initialized)
            .field("is_active", &state.is_active)
            .finish()
    }
}

pub(crate) struct TransitionScope<'a> {
    lifecycle: &'a Lifecycle,
    phase: Phase,
}

impl Drop for TransitionScope<'_> {
    fn drop(&mut self) {
        let (transition, initialization) = {
            let mut state = self.lifecycle.state.lock();
            match self.phase {
                Phase::Activation => {
                    // A failed initialization must still wake waiters.
                    let init = if state.is_initialized {
                        None
                    } else {
                        state.initialization.take()
                    };
                    (state.activation.take(), init)
                }
                Phase::Deactivation => (state.deactivation.take(), None),
            }
        };
        if let Some(completion) = initialization {
            completion.finish();
        }
        if let Some(transition) = transition {
            transition.done.finish();
        }
    }
}
