//! OneActive - collection conductor with a single active item.
//!
//! The tabbed-UI policy: the conductor owns an ordered collection, exactly
//! one member of which is active at any settled point. Closing the active
//! item selects its previous neighbor (or the next tab when the first one
//! closes); close negotiation can cascade partial closes while keeping the
//! active slot off anything about to be force-closed.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::close::{CloseStrategy, DefaultCloseStrategy};
use crate::collection::ObservableList;
use crate::conductor::{
    determine_next_item_to_activate, ActivationProcessed, ActiveItemHost, ConductorEvents, Parent,
};
use crate::error::{ConductorError, ScreenError};
use crate::lifecycle::{Lifecycle, ScreenId};
use crate::screen::{same_screen, CloseHost, DialogResult, Screen, ScreenExt};

pub struct OneActive<T: Screen + ?Sized> {
    lifecycle: Lifecycle,
    weak: Weak<Self>,
    items: ObservableList<T>,
    active: Mutex<Option<Arc<T>>>,
    events: ConductorEvents<T>,
    close_strategy: Mutex<Arc<dyn CloseStrategy<T>>>,
}

impl<T: Screen + ?Sized> OneActive<T> {
    pub fn new() -> Arc<Self> {
        Self::with_close_strategy(Arc::new(DefaultCloseStrategy::default()))
    }

    pub fn with_close_strategy(strategy: Arc<dyn CloseStrategy<T>>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            lifecycle: Lifecycle::new(),
            weak: weak.clone(),
            items: ObservableList::new(),
            active: Mutex::new(None),
            events: ConductorEvents::new(),
            close_strategy: Mutex::new(strategy),
        })
    }

    pub fn items(&self) -> &ObservableList<T> {
        &self.items
    }

    pub fn active_item(&self) -> Option<Arc<T>> {
        self.active.lock().clone()
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

    /// Activate an item, inserting it into the collection if it is not
    /// already conducted. `None` auto-selects a replacement via the
    /// neighbor rule.
    pub async fn activate_item(
        &self,
        item: Option<Arc<T>>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        if let Some(item) = &item {
            if self.is_item_active(item) {
                if self.lifecycle.is_active() {
                    item.activate(token).await?;
                }
                self.events
                    .activation_processed()
                    .raise(ActivationProcessed {
                        item: Some(item.clone()),
                        success: true,
                    })
                    .await;
                return Ok(());
            }
        }
        self.change_active_item(item, false, token).await
    }

    /// Deactivate an item; with `close` the item's guard is consulted and,
    /// on consent, the item is closed and removed.
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
            self.close_item_core(item, token).await?;
        }
        Ok(())
    }

    async fn close_item_core(&self, item: Arc<T>, token: &CancellationToken) -> Result<(), ScreenError> {
        if self.is_item_active(&item) {
            let snapshot = self.items.snapshot();
            let index = snapshot
                .iter()
                .position(|candidate| same_screen(candidate, &item))
                .map(|i| i as isize)
                .unwrap_or(-1);
            let next = determine_next_item_to_activate(&snapshot, index);
            self.change_active_item(next, true, token).await?;
        } else {
            item.deactivate(true, token).await?;
        }
        self.items.remove_first(|candidate| same_screen(candidate, &item));
        Ok(())
    }
}

#[async_trait]
impl<T: Screen + ?Sized> ActiveItemHost<T> for OneActive<T> {
    fn slot(&self) -> &Mutex<Option<Arc<T>>> {
        &self.active
    }

    fn host_events(&self) -> &ConductorEvents<T> {
        &self.events
    }

    fn ensure_item(&self, item: Option<Arc<T>>) -> Option<Arc<T>> {
        let resolved = match item {
            Some(new_item) => {
                let canonical = self
                    .items
                    .find(|candidate| same_screen(candidate, &new_item));
                match canonical {
                    Some(existing) => Some(existing),
                    None => {
                        self.items.add(new_item.clone());
                        Some(new_item)
                    }
                }
            }
            None => {
                let snapshot = self.items.snapshot();
                let index = self
                    .active
                    .lock()
                    .as_ref()
                    .and_then(|active| {
                        snapshot
                            .iter()
                            .position(|candidate| same_screen(candidate, active))
                    })
                    .map(|i| i as isize)
                    .unwrap_or(0);
                determine_next_item_to_activate(&snapshot, index)
            }
        };
        if let Some(item) = &resolved {
            let host: Weak<dyn CloseHost> = self.weak.clone();
            item.lifecycle().set_parent(host);
        }
        resolved
    }
}

#[async_trait]
impl<T: Screen + ?Sized> Screen for OneActive<T> {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    async fn on_activate(&self, token: &CancellationToken) -> Result<(), ScreenError> {
        if let Some(item) = self.active_item() {
            item.activate(token).await?;
        }
        Ok(())
    }

    async fn on_deactivate(&self, close: bool, token: &CancellationToken) -> Result<(), ScreenError> {
        if close {
            for item in self.items.snapshot() {
                item.deactivate(true, token).await?;
            }
            self.items.clear();
            *self.active.lock() = None;
        } else if let Some(item) = self.active_item() {
            item.deactivate(false, token).await?;
        }
        Ok(())
    }

    /// Close negotiation over the whole collection. When only a subset may
    /// close, the active slot is first advanced, against a shrinking copy of
    /// the item list, past every member of that subset; the subset is then
    /// closed and removed. The authoritative collection is only mutated
    /// after the walk, so the copy and the collection intentionally diverge
    /// during it.
    async fn can_close(&self, token: &CancellationToken) -> Result<bool, ScreenError> {
        let result = self
            .close_strategy()
            .execute(self.items.snapshot(), token)
            .await?;
        if result.close_can_occur || result.closable.is_empty() {
            return Ok(result.close_can_occur);
        }

        let mut closable = result.closable;
        let active = self.active.lock().clone();
        if let Some(active) = active {
            if closable.iter().any(|item| same_screen(item, &active)) {
                let mut list = self.items.snapshot();
                let mut cursor = active.clone();
                let chosen = loop {
                    let index = list
                        .iter()
                        .position(|candidate| same_screen(candidate, &cursor))
                        .map(|i| i as isize)
                        .unwrap_or(-1);
                    let candidate = determine_next_item_to_activate(&list, index);
                    list.retain(|item| !same_screen(item, &cursor));
                    match candidate {
                        Some(candidate)
                            if closable.iter().any(|item| same_screen(item, &candidate)) =>
                        {
                            cursor = candidate;
                        }
                        other => break other,
                    }
                };
                self.change_active_item(chosen, true, token).await?;
                self.items.remove_first(|item| same_screen(item, &active));
                closable.retain(|item| !same_screen(item, &active));
            }
        }

        for item in &closable {
            item.deactivate(true, token).await?;
        }
        self.items
            .remove_where(|item| closable.iter().any(|closing| same_screen(closing, item)));
        Ok(false)
    }
}

#[async_trait]
impl<T: Screen + ?Sized> CloseHost for OneActive<T> {
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

impl<T: Screen + ?Sized> Parent<T> for OneActive<T> {
    fn children(&self) -> Vec<Arc<T>> {
        self.items.snapshot()
    }
}
