//! Screen - the user-facing lifecycle hook trait and its transition drivers.
//!
//! A screen is any object that embeds a [`Lifecycle`] and participates in the
//! activate/deactivate/initialize/guard-close cycle. The trait follows the
//! hook-method pattern: implementors override the `on_*` hooks they care
//! about and leave the rest defaulted; the framework drives the state machine
//! through [`ScreenExt`], which cannot be overridden.
//!
//! Cancellation is cooperative. A hook receives a token and is expected to
//! return promptly once it is cancelled; the driver never force-aborts a
//! running hook, and a cancelled transition still completes its bookkeeping.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{ConductorError, ScreenError};
use crate::lifecycle::{
    ActivationEvent, ActivationPlan, DeactivationEvent, DeactivationPlan, Lifecycle, Phase,
    ScreenId,
};

/// Outcome a dialog screen reports when it closes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogResult {
    Confirmed,
    Cancelled,
}

/// The close surface a conductor exposes to its children.
///
/// A screen's parent link points at this, so `try_close` can delegate the
/// close request without knowing the conductor's item type.
#[async_trait]
pub trait CloseHost: Send + Sync {
    /// Close the conducted child with the given id. `dialog_result` is
    /// meaningful only to dialog-hosting conductors; others ignore it.
    async fn close_child(
        &self,
        id: ScreenId,
        dialog_result: Option<DialogResult>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError>;
}

/// A unit participating in the activate/deactivate/initialize lifecycle.
#[async_trait]
pub trait Screen: Send + Sync + 'static {
    /// The embedded state machine. One per screen; the framework owns every
    /// transition of it.
    fn lifecycle(&self) -> &Lifecycle;

    /// Name for display purposes; defaults to the stored name, falling back
    /// to the concrete type name.
    fn display_name(&self) -> String {
        self.lifecycle()
            .display_name()
            .unwrap_or_else(|| std::any::type_name::<Self>().to_string())
    }

    /// One-time initialization, run during the first activation under the
    /// caller's original token. A racing deactivation can never cancel it;
    /// once started it always completes.
    async fn on_initialize(&self, token: &CancellationToken) -> Result<(), ScreenError> {
        let _ = token;
        Ok(())
    }

    /// Per-activation hook, run under the activation's derived token; a
    /// subsequent deactivation request cancels that token.
    async fn on_activate(&self, token: &CancellationToken) -> Result<(), ScreenError> {
        let _ = token;
        Ok(())
    }

    /// Per-deactivation hook. `close` distinguishes a plain deactivation
    /// from one that closes the screen for good.
    async fn on_deactivate(&self, close: bool, token: &CancellationToken) -> Result<(), ScreenError> {
        let _ = (close, token);
        Ok(())
    }

    /// Close guard. Returning `false` vetoes a close (e.g. unsaved changes);
    /// not an error, a negotiated outcome.
    async fn can_close(&self, token: &CancellationToken) -> Result<bool, ScreenError> {
        let _ = token;
        Ok(true)
    }
}

/// Transition drivers, blanket-implemented for every screen.
///
/// These implement the normative lifecycle contract and are deliberately not
/// overridable; screens customize behavior through the `Screen` hooks only.
#[async_trait]
pub trait ScreenExt: Screen {
    /// Drive the screen to the active state.
    ///
    /// No-op if already active. Cancels and sequences behind any in-flight
    /// deactivation, initializes on first activation, then runs the
    /// activation hook and raises `Activated`. A concurrent activation is
    /// coalesced: the later caller awaits the in-flight one.
    async fn activate(&self, token: &CancellationToken) -> Result<(), ScreenError>;

    /// Drive the screen to the inactive state, optionally closing it.
    ///
    /// Defers behind in-flight initialization, cancels and sequences behind
    /// any in-flight activation, then runs the deactivating/deactivate/
    /// deactivated sequence if the screen is active or (`close` and
    /// initialized). Idempotent otherwise.
    async fn deactivate(&self, close: bool, token: &CancellationToken) -> Result<(), ScreenError>;

    /// Ask the parent conductor to close this screen.
    async fn try_close(&self, dialog_result: Option<DialogResult>) -> Result<(), ScreenError>;
}

#[async_trait]
impl<S: Screen + ?Sized> ScreenExt for S {
    async fn activate(&self, token: &CancellationToken) -> Result<(), ScreenError> {
        let lifecycle = self.lifecycle();
        let plan = lifecycle.begin_activation(token);
        let (cancel, wait_deactivation, needs_init) = match plan {
            ActivationPlan::AlreadyActive => return Ok(()),
            ActivationPlan::InFlight(done) => {
                done.wait().await;
                return Ok(());
            }
            ActivationPlan::Run {
                cancel,
                wait_deactivation,
                needs_init,
            } => (cancel, wait_deactivation, needs_init),
        };

        let _busy = lifecycle.busy().token();
        let _scope = lifecycle.transition_scope(Phase::Activation);

        if let Some(deactivation) = wait_deactivation {
            deactivation.wait().await;
        }

        let was_initialized = if needs_init {
            tracing::debug!(screen = %self.display_name(), id = %lifecycle.id(), "initializing");
            self.on_initialize(token).await?;
            lifecycle.mark_initialized();
            true
        } else {
            false
        };

        self.on_activate(&cancel).await?;
        lifecycle.set_active(true);
        tracing::trace!(screen = %self.display_name(), id = %lifecycle.id(), "activated");
        lifecycle
            .activated()
            .raise(ActivationEvent { was_initialized })
            .await;

        if cancel.is_cancelled() {
            tracing::debug!(
                screen = %self.display_name(),
                id = %lifecycle.id(),
                "activation was superseded; a deactivation will follow"
            );
        }
        Ok(())
    }

    async fn deactivate(&self, close: bool, token: &CancellationToken) -> Result<(), ScreenError> {
        let lifecycle = self.lifecycle();
        let plan = lifecycle.begin_deactivation(token);
        let (cancel, wait_initialization) = match plan {
            DeactivationPlan::InFlight(done) => {
                done.wait().await;
                return Ok(());
            }
            DeactivationPlan::Run {
                cancel,
                wait_initialization,
            } => (cancel, wait_initialization),
        };

        let _busy = lifecycle.busy().token();
        let _scope = lifecycle.transition_scope(Phase::Deactivation);

        if let Some(initialization) = wait_initialization {
            initialization.wait().await;
            if cancel.is_cancelled() {
                tracing::debug!(
                    screen = %self.display_name(),
                    id = %lifecycle.id(),
                    "deactivation cancelled while deferring to initialization"
                );
                return Ok(());
            }
        }

        if let Some(activation) = lifecycle.interrupt_activation() {
            activation.wait().await;
        }

        if !lifecycle.should_deactivate(close) {
            return Ok(());
        }

        lifecycle
            .deactivating()
            .raise(DeactivationEvent { close })
            .await;
        self.on_deactivate(close, &cancel).await?;
        lifecycle.set_active(false);
        tracing::trace!(
            screen = %self.display_name(),
            id = %lifecycle.id(),
            close = close,
            "deactivated"
        );
        lifecycle
            .deactivated()
            .raise(DeactivationEvent { close })
            .await;
        Ok(())
    }

    async fn try_close(&self, dialog_result: Option<DialogResult>) -> Result<(), ScreenError> {
        let lifecycle = self.lifecycle();
        let parent = lifecycle.parent().ok_or(ConductorError::NoParent)?;
        let parent = parent.upgrade().ok_or(ConductorError::ParentGone)?;
        parent
            .close_child(lifecycle.id(), dialog_result, &CancellationToken::new())
            .await
    }
}

/// Identity comparison for conducted items.
pub(crate) fn same_screen<T: Screen + ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    a.lifecycle().id() == b.lifecycle().id()
}
