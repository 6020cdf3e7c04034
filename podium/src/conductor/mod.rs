//! Conductors - parent screens that own and manage the lifecycle of children.
//!
//! Three policies are provided:
//! - [`Conductor`] holds a single conducted item;
//! - [`OneActive`] owns a collection with one active item (tabs);
//! - [`AllActive`] owns a collection whose items are all active together
//!   (docked regions, open windows).
//!
//! Conductors are themselves screens, so they nest into trees; activating a
//! conductor cascades into its children, and close negotiation cascades back
//! up through the pluggable [`CloseStrategy`](crate::close::CloseStrategy).
//!
//! All conductors are constructed behind `Arc` (via `Arc::new_cyclic`) so
//! they can hand children a weak parent link when they take ownership.

mod all_active;
mod one_active;
mod single;

pub use all_active::AllActive;
pub use one_active::OneActive;
pub use single::Conductor;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::ScreenError;
use crate::event::{AsyncEvent, Notifier};
use crate::lifecycle::ScreenId;
use crate::screen::{same_screen, Screen, ScreenExt};

/// Reports the outcome of an activation request to external listeners
/// (e.g. view-resolution logic that must materialize or discard a view).
pub struct ActivationProcessed<T: ?Sized> {
    /// The item the request settled on; `None` when the request left the
    /// conductor with no item (still a processed request).
    pub item: Option<Arc<T>>,
    /// Whether the requested item was actually activated.
    pub success: bool,
}

impl<T: ?Sized> Clone for ActivationProcessed<T> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
            success: self.success,
        }
    }
}

impl<T: Screen + ?Sized> fmt::Debug for ActivationProcessed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationProcessed")
            .field("item", &self.item.as_ref().map(|i| i.lifecycle().id()))
            .field("success", &self.success)
            .finish()
    }
}

/// Event surface every conductor exposes.
pub struct ConductorEvents<T: ?Sized> {
    activation_processed: AsyncEvent<ActivationProcessed<T>>,
    active_item_changed: Notifier<Option<ScreenId>>,
}

impl<T: Screen + ?Sized> ConductorEvents<T> {
    pub(crate) fn new() -> Self {
        Self {
            activation_processed: AsyncEvent::new(),
            active_item_changed: Notifier::new(),
        }
    }

    /// Raised once per processed activation request, after the underlying
    /// item's own transition has settled.
    pub fn activation_processed(&self) -> &AsyncEvent<ActivationProcessed<T>> {
        &self.activation_processed
    }

    /// Raised when the active-item slot changes, with the new item's id.
    pub fn active_item_changed(&self) -> &Notifier<Option<ScreenId>> {
        &self.active_item_changed
    }
}

/// Exposes the current child set for external tree-walking.
pub trait Parent<T: Screen + ?Sized> {
    fn children(&self) -> Vec<Arc<T>>;
}

/// Internal contract shared by the conductors that maintain an active-item
/// slot. Provides the single active-item transition algorithm every variant
/// reuses, so the contract stays uniform: the old item's deactivation always
/// happens-before the new item's activation, and `ActivationProcessed` is
/// raised exactly once per request after the transition settles.
#[async_trait]
pub(crate) trait ActiveItemHost<T: Screen + ?Sized>: Screen {
    fn slot(&self) -> &Mutex<Option<Arc<T>>>;
    fn host_events(&self) -> &ConductorEvents<T>;

    /// Take ownership of the item: set its parent link and, for collection
    /// conductors, insert it or reuse the canonical collection member.
    /// `None` may resolve to a replacement (policy-specific).
    fn ensure_item(&self, item: Option<Arc<T>>) -> Option<Arc<T>>;

    fn active_item_now(&self) -> Option<Arc<T>> {
        self.slot().lock().clone()
    }

    fn is_item_active(&self, item: &Arc<T>) -> bool {
        self.slot()
            .lock()
            .as_ref()
            .map(|active| same_screen(active, item))
            .unwrap_or(false)
    }

    async fn change_active_item(
        &self,
        new_item: Option<Arc<T>>,
        close_previous: bool,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        if let Some(previous) = self.active_item_now() {
            previous.deactivate(close_previous, token).await?;
        }

        let new_item = self.ensure_item(new_item);
        *self.slot().lock() = new_item.clone();
        self.host_events()
            .active_item_changed
            .notify(&new_item.as_ref().map(|item| item.lifecycle().id()));

        if self.lifecycle().is_active() {
            if let Some(item) = &new_item {
                item.activate(token).await?;
            }
        }

        self.host_events()
            .activation_processed
            .raise(ActivationProcessed {
                item: new_item,
                success: true,
            })
            .await;
        Ok(())
    }
}

/// Neighbor-selection rule shared by the tabbed conductor variants: prefer
/// the item before the removed index; when the first item was removed and
/// more than one remains, prefer the second; otherwise none.
pub(crate) fn determine_next_item_to_activate<T: ?Sized>(
    list: &[Arc<T>],
    last_index: isize,
) -> Option<Arc<T>> {
    let mut to_activate = last_index - 1;
    if to_activate == -1 && list.len() > 1 {
        to_activate = 1;
    }
    if to_activate >= 0 && (to_activate as usize) < list.len() {
        Some(list[to_activate as usize].clone())
    } else {
        None
    }
}
