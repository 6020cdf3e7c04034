//! ObservableList - an ordered, change-notifying collection of shared items.
//!
//! Conductors own their children through this list. Consumers must mutate it
//! only through the provided operations; bulk operations suspend per-item
//! notifications and emit a single `Reset` instead of N individual changes.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::Notifier;

/// Change notification payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListChanged {
    Added { index: usize },
    Removed { index: usize },
    Reset,
}

struct ListState<T: ?Sized> {
    items: Vec<Arc<T>>,
    suspensions: usize,
    pending: bool,
}

/// Ordered collection of `Arc<T>` with change notification.
pub struct ObservableList<T: ?Sized> {
    state: Mutex<ListState<T>>,
    changed: Notifier<ListChanged>,
}

impl<T: ?Sized> ObservableList<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ListState {
                items: Vec::new(),
                suspensions: 0,
                pending: false,
            }),
            changed: Notifier::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Arc<T>> {
        self.state.lock().items.get(index).cloned()
    }

    /// A point-in-time copy of the items.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.state.lock().items.clone()
    }

    /// First item matching the predicate.
    pub fn find<P>(&self, predicate: P) -> Option<Arc<T>>
    where
        P: Fn(&Arc<T>) -> bool,
    {
        self.state.lock().items.iter().find(|i| predicate(i)).cloned()
    }

    pub fn position<P>(&self, predicate: P) -> Option<usize>
    where
        P: Fn(&Arc<T>) -> bool,
    {
        self.state.lock().items.iter().position(|i| predicate(i))
    }

    /// Append an item, returning its index.
    pub fn add(&self, item: Arc<T>) -> usize {
        let index = {
            let mut state = self.state.lock();
            state.items.push(item);
            state.items.len() - 1
        };
        self.notify(ListChanged::Added { index });
        index
    }

    /// Remove the first item matching the predicate.
    pub fn remove_first<P>(&self, predicate: P) -> Option<Arc<T>>
    where
        P: Fn(&Arc<T>) -> bool,
    {
        let removed = {
            let mut state = self.state.lock();
            match state.items.iter().position(|i| predicate(i)) {
                Some(index) => Some((index, state.items.remove(index))),
                None => None,
            }
        };
        removed.map(|(index, item)| {
            self.notify(ListChanged::Removed { index });
            item
        })
    }

    /// Append many items, emitting one `Reset` instead of per-item changes.
    pub fn add_range<I>(&self, items: I)
    where
        I: IntoIterator<Item = Arc<T>>,
    {
        let suspension = self.suspend();
        for item in items {
            self.add(item);
        }
        drop(suspension);
    }

    /// Remove every item matching the predicate, emitting one `Reset`.
    pub fn remove_where<P>(&self, predicate: P) -> Vec<Arc<T>>
    where
        P: Fn(&Arc<T>) -> bool,
    {
        let suspension = self.suspend();
        let mut removed = Vec::new();
        while let Some(item) = self.remove_first(&predicate) {
            removed.push(item);
        }
        drop(suspension);
        removed
    }

    pub fn clear(&self) {
        let had_items = {
            let mut state = self.state.lock();
            let had = !state.items.is_empty();
            state.items.clear();
            had
        };
        if had_items {
            self.notify(ListChanged::Reset);
        }
    }

    pub fn on_changed<F>(&self, handler: F)
    where
        F: Fn(&ListChanged) + Send + Sync + 'static,
    {
        self.changed.subscribe(handler);
    }

    /// Suspend notifications until the returned scope drops; if anything
    /// changed while suspended, a single `Reset` is emitted on resume.
    pub fn suspend(&self) -> ListSuspension<'_, T> {
        self.state.lock().suspensions += 1;
        ListSuspension { list: self }
    }

    fn notify(&self, change: ListChanged) {
        {
            let mut state = self.state.lock();
            if state.suspensions > 0 {
                state.pending = true;
                return;
            }
        }
        self.changed.notify(&change);
    }
}

impl<T: ?Sized> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Notification-suspension scope for [`ObservableList`].
pub struct ListSuspension<'a, T: ?Sized> {
    list: &'a ObservableList<T>,
}

impl<T: ?Sized> Drop for ListSuspension<'_, T> {
    fn drop(&mut self) {
        let emit = {
            let mut state = self.list.state.lock();
            state.suspensions -= 1;
            if state.suspensions == 0 && state.pending {
                state.pending = false;
                true
            } else {
                false
            }
        };
        if emit {
            self.list.changed.notify(&ListChanged::Reset);
        }
    }
}
