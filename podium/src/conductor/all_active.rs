//! AllActive - collection conductor whose items are all active together.
//!
//! Models docked regions or a set of open windows: every conducted item is
//! activated alongside the conductor, there is no active-item slot, and
//! close negotiation can shed the closable subset while the rest stays up.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::close::{CloseStrategy, DefaultCloseStrategy};
use crate::collection::ObservableList;
use crate::conductor::{ActivationProcessed, ConductorEvents, Parent};
use crate::error::{ConductorError, ScreenError};
use crate::lifecycle::{Lifecycle, ScreenId};
use crate::screen::{same_screen, CloseHost, DialogResult, Screen, ScreenExt};

pub struct AllActive<T: Screen + ?Sized> {
    lifecycle: Lifecycle,
    weak: Weak<Self>,
    items: ObservableList<T>,
    events: ConductorEvents<T>,
    close_strategy: Mutex<Arc<dyn CloseStrategy<T>>>,
}

impl<T: Screen + ?Sized> AllActive<T> {
    pub fn new() -> Arc<Self> {
        Self::with_close_strategy(Arc::new(DefaultCloseStrategy::default()))
    }

    pub fn with_close_strategy(strategy: Arc<dyn CloseStrategy<T>>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            lifecycle: Lifecycle::new(),
            weak: weak.clone(),
            items: ObservableList::new(),
            events: ConductorEvents::new(),
            close_strategy: Mutex::new(strategy),
        })
    }

    pub fn items(&self) -> &ObservableList<T> {
        &self.items
    }

    pub fn events(&self) -> &ConductorEvents<T> {
        &self.events
    }

    pub fn close_strategy(&self) -> Arc<dyn CloseStrategy<T>> {
        self.close_strategy.lock().clone()
    }

    pub fn set_close_strategy(&self, strategy: Arc<dyn CloseStrategy<T>>) {
        *self.close_strategy.lock() = strategy;
    }

    /// Take ownership of an item without activating it. The item will come
    /// up with the conductor, or through a later [`activate_item`] call.
    ///
    /// [`activate_item`]: AllActive::activate_item
    pub fn conduct(&self, item: Arc<T>) {
        self.ensure_item(&item);
    }

    /// Conduct an item and, if this conductor is active, activate it.
    pub async fn activate_item(
        &self,
        item: Arc<T>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        self.ensure_item(&item);
        if self.lifecycle.is_active() {
            item.activate(token).await?;
        }
        self.events
            .activation_processed()
            .raise(ActivationProcessed {
                item: Some(item),
                success: true,
            })
            .await;
        Ok(())
    }

    /// Deactivate an item; with `close` its guard is consulted and, on
    /// consent, the item is closed and released from the collection.
    pub async fn deactivate_item(
        &self,
        item: Arc<T>,
        close: bool,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        if !close {
            return item.deactivate(false, token).await;
        }
        let close_can_occur = self
            .close_strategy()
            .execute(vec![item.clone()], token)
            .await?
            .close_can_occur;
        if close_can_occur {
            item.deactivate(true, token).await?;
            self.items.remove_first(|candidate| same_screen(candidate, &item));
        }
        Ok(())
    }

    fn ensure_item(&self, item: &Arc<T>) {
        if self.items.find(|candidate| same_screen(candidate, item)).is_none() {
            self.items.add(item.clone());
        }
        let host: Weak<dyn CloseHost> = self.weak.clone();
        item.lifecycle().set_parent(host);
    }
}

#[async_trait]
impl<T: Screen + ?Sized> Screen for AllActive<T> {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    async fn on_activate(&self, token: &CancellationToken) -> Result<(), ScreenError> {
        for item in self.items.snapshot() {
            item.activate(token).await?;
        }
        Ok(())
    }

    async fn on_deactivate(&self, close: bool, token: &CancellationToken) -> Result<(), ScreenError> {
        for item in self.items.snapshot() {
            item.deactivate(close, token).await?;
        }
        if close {
            self.items.clear();
        }
        Ok(())
    }

    /// Negotiates over all items; when the set cannot close as a whole, the
    /// closable subset is closed and released anyway, and the refusal is
    /// reported to the caller.
    async fn can_close(&self, token: &CancellationToken) -> Result<bool, ScreenError> {
        let result = self
            .close_strategy()
            .execute(self.items.snapshot(), token)
            .await?;
        if !result.close_can_occur && !result.closable.is_empty() {
            for item in &result.closable {
                item.deactivate(true, token).await?;
            }
            self.items.remove_where(|item| {
                result
                    .closable
                    .iter()
                    .any(|closing| same_screen(closing, item))
            });
        }
        Ok(result.close_can_occur)
    }
}

#[async_trait]
impl<T: Screen + ?Sized> CloseHost for AllActive<T> {
    async fn close_child(
        &self,
        id: ScreenId,
        _dialog_result: Option<DialogResult>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        let item = self
            .items
            .find(|candidate| candidate.lifecycle().id() == id)
            .ok_or(ConductorError::NotOwned)?;
        self.deactivate_item(item, true, token).await
    }
}

impl<T: Screen + ?Sized> Parent<T> for AllActive<T> {
    fn children(&self) -> Vec<Arc<T>> {
        self.items.snapshot()
    }
}
