//! DialogConductor - modal dialog hosting with awaitable results.
//!
//! Conducts at most one dialog at a time over `dyn Screen`. `show_dialog`
//! suspends the caller until the dialog closes and yields the
//! [`DialogResult`] it closed with; a dialog displaced by a newer one, or
//! orphaned by the conductor shutting down, resolves its waiter with `None`
//! so nothing hangs on a dialog that will never close normally.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::close::{CloseStrategy, DefaultCloseStrategy};
use crate::conductor::{ActivationProcessed, ActiveItemHost, ConductorEvents, Parent};
use crate::error::{ConductorError, ScreenError};
use crate::lifecycle::{Lifecycle, ScreenId};
use crate::screen::{CloseHost, DialogResult, Screen, ScreenExt};

struct PendingDialog {
    dialog: ScreenId,
    tx: oneshot::Sender<Option<DialogResult>>,
}

pub struct DialogConductor {
    lifecycle: Lifecycle,
    weak: Weak<Self>,
    active: Mutex<Option<Arc<dyn Screen>>>,
    events: ConductorEvents<dyn Screen>,
    close_strategy: Mutex<Arc<dyn CloseStrategy<dyn Screen>>>,
    pending: Mutex<Option<PendingDialog>>,
}

impl DialogConductor {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            lifecycle: Lifecycle::new(),
            weak: weak.clone(),
            active: Mutex::new(None),
            events: ConductorEvents::new(),
            close_strategy: Mutex::new(Arc::new(DefaultCloseStrategy::default())),
            pending: Mutex::new(None),
        })
    }

    pub fn active_dialog(&self) -> Option<Arc<dyn Screen>> {
        self.active.lock().clone()
    }

    pub fn events(&self) -> &ConductorEvents<dyn Screen> {
        &self.events
    }

    pub fn set_close_strategy(&self, strategy: Arc<dyn CloseStrategy<dyn Screen>>) {
        *self.close_strategy.lock() = strategy;
    }

    fn close_strategy(&self) -> Arc<dyn CloseStrategy<dyn Screen>> {
        self.close_strategy.lock().clone()
    }

    /// Show a dialog and wait for it to close.
    ///
    /// Resolves with the result the dialog closed with; `None` when the
    /// dialog never became active (e.g. the current dialog refused to make
    /// way), was displaced by a newer dialog, or the conductor shut down.
    pub async fn show_dialog(
        &self,
        dialog: Arc<dyn Screen>,
        token: &CancellationToken,
    ) -> Result<Option<DialogResult>, ScreenError> {
        self.activate_dialog(dialog.clone(), token).await?;
        if !self.is_item_active(&dialog) {
            return Ok(None);
        }

        let (tx, rx) = oneshot::channel();
        let displaced = self.pending.lock().replace(PendingDialog {
            dialog: dialog.lifecycle().id(),
            tx,
        });
        if let Some(displaced) = displaced {
            let _ = displaced.tx.send(None);
        }
        Ok(rx.await.unwrap_or(None))
    }

    /// Close a conducted dialog with the given result, waking its
    /// `show_dialog` waiter. Closing a dialog this conductor does not hold
    /// is a caller bug, reported as [`ConductorError::NotOwned`].
    pub async fn close_dialog(
        &self,
        dialog: Arc<dyn Screen>,
        result: Option<DialogResult>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        if !self.is_item_active(&dialog) {
            return Err(ConductorError::NotOwned.into());
        }
        let close_can_occur = self
            .close_strategy()
            .execute(vec![dialog.clone()], token)
            .await?
            .close_can_occur;
        if !close_can_occur {
            return Ok(());
        }
        self.change_active_item(None, true, token).await?;
        if !self.is_item_active(&dialog) {
            self.resolve_pending(dialog.lifecycle().id(), result);
        }
        Ok(())
    }

    async fn activate_dialog(
        &self,
        dialog: Arc<dyn Screen>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        if self.is_item_active(&dialog) {
            self.events
                .activation_processed()
                .raise(ActivationProcessed {
                    item: Some(dialog),
                    success: true,
                })
                .await;
            return Ok(());
        }

        let displaced: Vec<Arc<dyn Screen>> = self.active.lock().iter().cloned().collect();
        let close_can_occur = if displaced.is_empty() {
            true
        } else {
            self.close_strategy()
                .execute(displaced, token)
                .await?
                .close_can_occur
        };

        if close_can_occur {
            self.change_active_item(Some(dialog), true, token).await
        } else {
            self.events
                .activation_processed()
                .raise(ActivationProcessed {
                    item: Some(dialog),
                    success: false,
                })
                .await;
            Ok(())
        }
    }

    fn resolve_pending(&self, dialog: ScreenId, result: Option<DialogResult>) {
        let mut pending = self.pending.lock();
        if pending.as_ref().map(|p| p.dialog) == Some(dialog) {
            if let Some(pending) = pending.take() {
                let _ = pending.tx.send(result);
            }
        }
    }

    fn resolve_any_pending(&self) {
        if let Some(pending) = self.pending.lock().take() {
            let _ = pending.tx.send(None);
        }
    }
}

#[async_trait]
impl ActiveItemHost<dyn Screen> for DialogConductor {
    fn slot(&self) -> &Mutex<Option<Arc<dyn Screen>>> {
        &self.active
    }

    fn host_events(&self) -> &ConductorEvents<dyn Screen> {
        &self.events
    }

    fn ensure_item(&self, item: Option<Arc<dyn Screen>>) -> Option<Arc<dyn Screen>> {
        if let Some(item) = &item {
            let host: Weak<dyn CloseHost> = self.weak.clone();
            item.lifecycle().set_parent(host);
        }
        item
    }
}

#[async_trait]
impl Screen for DialogConductor {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    async fn on_activate(&self, token: &CancellationToken) -> Result<(), ScreenError> {
        if let Some(dialog) = self.active_dialog() {
            dialog.activate(token).await?;
        }
        Ok(())
    }

    async fn on_deactivate(&self, close: bool, token: &CancellationToken) -> Result<(), ScreenError> {
        if let Some(dialog) = self.active_dialog() {
            dialog.deactivate(close, token).await?;
        }
        if close {
            *self.active.lock() = None;
        }
        self.resolve_any_pending();
        Ok(())
    }

    async fn can_close(&self, token: &CancellationToken) -> Result<bool, ScreenError> {
        let items: Vec<Arc<dyn Screen>> = self.active.lock().iter().cloned().collect();
        if items.is_empty() {
            return Ok(true);
        }
        Ok(self
            .close_strategy()
            .execute(items, token)
            .await?
            .close_can_occur)
    }
}

#[async_trait]
impl CloseHost for DialogConductor {
    async fn close_child(
        &self,
        id: ScreenId,
        dialog_result: Option<DialogResult>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        let dialog = self
            .active_dialog()
            .filter(|dialog| dialog.lifecycle().id() == id)
            .ok_or(ConductorError::NotOwned)?;
        self.close_dialog(dialog, dialog_result, token).await
    }
}

impl Parent<dyn Screen> for DialogConductor {
    fn children(&self) -> Vec<Arc<dyn Screen>> {
        self.active.lock().iter().cloned().collect()
    }
}
