//! Conductor - single-item conductor.
//!
//! Holds at most one conducted item. Activating a new item first negotiates
//! the displaced item's close through the close strategy; refusal leaves the
//! current item in place and reports a failed activation request.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::close::{CloseStrategy, DefaultCloseStrategy};
use crate::conductor::{ActivationProcessed, ActiveItemHost, ConductorEvents, Parent};
use crate::error::{ConductorError, ScreenError};
use crate::lifecycle::{Lifecycle, ScreenId};
use crate::screen::{CloseHost, DialogResult, Screen, ScreenExt};

pub struct Conductor<T: Screen + ?Sized> {
    lifecycle: Lifecycle,
    weak: Weak<Self>,
    active: Mutex<Option<Arc<T>>>,
    events: ConductorEvents<T>,
    close_strategy: Mutex<Arc<dyn CloseStrategy<T>>>,
}

impl<T: Screen + ?Sized> Conductor<T> {
    pub fn new() -> Arc<Self> {
        Self::with_close_strategy(Arc::new(DefaultCloseStrategy::default()))
    }

    pub fn with_close_strategy(strategy: Arc<dyn CloseStrategy<T>>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            lifecycle: Lifecycle::new(),
            weak: weak.clone(),
            active: Mutex::new(None),
            events: ConductorEvents::new(),
            close_strategy: Mutex::new(strategy),
        })
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

    /// Activate an item, displacing and closing the current one if its close
    /// guard allows. `None` means "deactivate current, select nothing".
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

        let displaced: Vec<Arc<T>> = self.active.lock().iter().cloned().collect();
        let close_can_occur = if displaced.is_empty() {
            true
        } else {
            self.close_strategy()
                .execute(displaced, token)
                .await?
                .close_can_occur
        };

        if close_can_occur {
            self.change_active_item(item, true, token).await
        } else {
            self.events
                .activation_processed()
                .raise(ActivationProcessed {
                    item,
                    success: false,
                })
                .await;
            Ok(())
        }
    }

    /// Deactivate the conducted item, negotiating with its close guard.
    pub async fn deactivate_item(
        &self,
        item: Arc<T>,
        close: bool,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        if !self.is_item_active(&item) {
            return Ok(());
        }
        let close_can_occur = self
            .close_strategy()
            .execute(vec![item], token)
            .await?
            .close_can_occur;
        if close_can_occur {
            self.change_active_item(None, close, token).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Screen + ?Sized> ActiveItemHost<T> for Conductor<T> {
    fn slot(&self) -> &Mutex<Option<Arc<T>>> {
        &self.active
    }

    fn host_events(&self) -> &ConductorEvents<T> {
        &self.events
    }

    fn ensure_item(&self, item: Option<Arc<T>>) -> Option<Arc<T>> {
        if let Some(item) = &item {
            let host: Weak<dyn CloseHost> = self.weak.clone();
            item.lifecycle().set_parent(host);
        }
        item
    }
}

#[async_trait]
impl<T: Screen + ?Sized> Screen for Conductor<T> {
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
        if let Some(item) = self.active_item() {
            item.deactivate(close, token).await?;
        }
        Ok(())
    }

    async fn can_close(&self, token: &CancellationToken) -> Result<bool, ScreenError> {
        let items: Vec<Arc<T>> = self.active.lock().iter().cloned().collect();
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
impl<T: Screen + ?Sized> CloseHost for Conductor<T> {
    async fn close_child(
        &self,
        id: ScreenId,
        _dialog_result: Option<DialogResult>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        let item = self
            .active_item()
            .filter(|item| item.lifecycle().id() == id)
            .ok_or(ConductorError::NotOwned)?;
        self.deactivate_item(item, true, token).await
    }
}

impl<T: Screen + ?Sized> Parent<T> for Conductor<T> {
    fn children(&self) -> Vec<Arc<T>> {
        self.active.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Item {
        lifecycle: Lifecycle,
        allow_close: AtomicBool,
        activations: AtomicUsize,
    }

    impl Item {
        fn new(name: &str, allow_close: bool) -> Arc<Self> {
            Arc::new(Self {
                lifecycle: Lifecycle::named(name),
                allow_close: AtomicBool::new(allow_close),
                activations: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Screen for Item {
        fn lifecycle(&self) -> &Lifecycle {
            &self.lifecycle
        }

        async fn on_activate(&self, _token: &CancellationToken) -> Result<(), ScreenError> {
            self.activations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn can_close(&self, _token: &CancellationToken) -> Result<bool, ScreenError> {
            Ok(self.allow_close.load(Ordering::SeqCst))
        }
    }

    fn processed_log(
        conductor: &Conductor<Item>,
    ) -> Arc<PlMutex<Vec<(Option<ScreenId>, bool)>>> {
        let log = Arc::new(PlMutex::new(Vec::new()));
        let sink = log.clone();
        conductor
            .events()
            .activation_processed()
            .subscribe_fn(move |event: ActivationProcessed<Item>| {
                sink.lock()
                    .push((event.item.as_ref().map(|i| i.lifecycle().id()), event.success));
            });
        log
    }

    #[tokio::test]
    async fn activating_new_item_displaces_and_closes_previous() {
        let conductor = Conductor::<Item>::new();
        let token = CancellationToken::new();
        conductor.activate(&token).await.unwrap();

        let first = Item::new("first", true);
        let second = Item::new("second", true);
        conductor
            .activate_item(Some(first.clone()), &token)
            .await
            .unwrap();
        conductor
            .activate_item(Some(second.clone()), &token)
            .await
            .unwrap();

        assert!(!first.lifecycle().is_active());
        assert!(second.lifecycle().is_active());
        assert_eq!(
            conductor.active_item().map(|i| i.lifecycle().id()),
            Some(second.lifecycle().id())
        );
    }

    #[tokio::test]
    async fn guard_refusal_keeps_current_and_reports_failure() {
        let conductor = Conductor::<Item>::new();
        let token = CancellationToken::new();
        conductor.activate(&token).await.unwrap();
        let log = processed_log(&conductor);

        let stubborn = Item::new("stubborn", false);
        let next = Item::new("next", true);
        conductor
            .activate_item(Some(stubborn.clone()), &token)
            .await
            .unwrap();
        conductor
            .activate_item(Some(next.clone()), &token)
            .await
            .unwrap();

        assert!(stubborn.lifecycle().is_active());
        assert_eq!(
            conductor.active_item().map(|i| i.lifecycle().id()),
            Some(stubborn.lifecycle().id())
        );
        let log = log.lock();
        assert_eq!(
            *log,
            vec![
                (Some(stubborn.lifecycle().id()), true),
                (Some(next.lifecycle().id()), false),
            ]
        );
    }

    #[tokio::test]
    async fn activating_none_deselects_gracefully() {
        let conductor = Conductor::<Item>::new();
        let token = CancellationToken::new();
        conductor.activate(&token).await.unwrap();
        let log = processed_log(&conductor);

        let item = Item::new("only", true);
        conductor
            .activate_item(Some(item.clone()), &token)
            .await
            .unwrap();
        conductor.activate_item(None, &token).await.unwrap();

        assert!(conductor.active_item().is_none());
        assert!(!item.lifecycle().is_active());
        assert_eq!(log.lock().last(), Some(&(None, true)));
    }

    #[tokio::test]
    async fn reactivating_active_item_is_idempotent_but_still_processed() {
        let conductor = Conductor::<Item>::new();
        let token = CancellationToken::new();
        conductor.activate(&token).await.unwrap();
        let log = processed_log(&conductor);

        let item = Item::new("tab", true);
        conductor
            .activate_item(Some(item.clone()), &token)
            .await
            .unwrap();
        conductor
            .activate_item(Some(item.clone()), &token)
            .await
            .unwrap();

        // The activation hook ran once; the request was processed twice.
        assert_eq!(item.activations.load(Ordering::SeqCst), 1);
        assert_eq!(log.lock().len(), 2);
        assert!(log.lock().iter().all(|(_, success)| *success));
    }

    #[tokio::test]
    async fn item_can_close_itself_through_parent() {
        let conductor = Conductor::<Item>::new();
        let token = CancellationToken::new();
        conductor.activate(&token).await.unwrap();

        let item = Item::new("closing", true);
        conductor
            .activate_item(Some(item.clone()), &token)
            .await
            .unwrap();
        item.try_close(None).await.unwrap();

        assert!(conductor.active_item().is_none());
        assert!(!item.lifecycle().is_active());
    }

    #[tokio::test]
    async fn inactive_conductor_defers_item_activation() {
        let conductor = Conductor::<Item>::new();
        let token = CancellationToken::new();

        let item = Item::new("deferred", true);
        conductor
            .activate_item(Some(item.clone()), &token)
            .await
            .unwrap();
        assert!(!item.lifecycle().is_active());

        conductor.activate(&token).await.unwrap();
        assert!(item.lifecycle().is_active());
    }
}
