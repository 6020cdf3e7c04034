//! Close strategies - pluggable policy for close negotiation across children.
//!
//! Given a set of candidate children, a strategy decides whether all can
//! close, and if not, which subset individually could. Conductors run their
//! strategy before displacing or closing items; the result is a negotiated
//! outcome, never an error.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ScreenError;
use crate::screen::Screen;

/// Outcome of one close negotiation.
pub struct CloseResult<T: ?Sized> {
    /// Whether every candidate may close.
    pub close_can_occur: bool,
    /// The candidates that are individually closable, in input order. Used
    /// to cascade partial closes when the parent cannot close as a whole.
    pub closable: Vec<Arc<T>>,
}

/// Policy deciding which of a set of children may close.
#[async_trait]
pub trait CloseStrategy<T: Screen + ?Sized>: Send + Sync {
    async fn execute(
        &self,
        items: Vec<Arc<T>>,
        token: &CancellationToken,
    ) -> Result<CloseResult<T>, ScreenError>;
}

/// Default strategy: ask every child's close guard, in iteration order.
///
/// When not every child can close, the closable subset is kept only if the
/// strategy was constructed to close conducted items anyway; otherwise the
/// subset is discarded and nothing closes.
pub struct DefaultCloseStrategy {
    close_conducted_items_when_conductor_cannot_close: bool,
}

impl DefaultCloseStrategy {
    pub fn new(close_conducted_items_when_conductor_cannot_close: bool) -> Self {
        Self {
            close_conducted_items_when_conductor_cannot_close,
        }
    }
}

impl Default for DefaultCloseStrategy {
    fn default() -> Self {
        Self::new(false)
    }
}

#[async_trait]
impl<T: Screen + ?Sized> CloseStrategy<T> for DefaultCloseStrategy {
    async fn execute(
        &self,
        items: Vec<Arc<T>>,
        token: &CancellationToken,
    ) -> Result<CloseResult<T>, ScreenError> {
        let mut close_can_occur = true;
        let mut closable = Vec::new();
        for item in items {
            let can_close = item.can_close(token).await?;
            if can_close {
                closable.push(item);
            }
            close_can_occur = close_can_occur && can_close;
        }
        if !close_can_occur && !self.close_conducted_items_when_conductor_cannot_close {
            closable.clear();
        }
        Ok(CloseResult {
            close_can_occur,
            closable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Lifecycle;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Guarded {
        lifecycle: Lifecycle,
        allow_close: AtomicBool,
    }

    impl Guarded {
        fn new(allow_close: bool) -> Arc<Self> {
            Arc::new(Self {
                lifecycle: Lifecycle::new(),
                allow_close: AtomicBool::new(allow_close),
            })
        }
    }

    #[async_trait]
    impl Screen for Guarded {
        fn lifecycle(&self) -> &Lifecycle {
            &self.lifecycle
        }

        async fn can_close(&self, _token: &CancellationToken) -> Result<bool, ScreenError> {
            Ok(self.allow_close.load(Ordering::SeqCst))
        }
    }

    #[tokio::test]
    async fn all_closable_when_every_guard_allows() {
        let strategy = DefaultCloseStrategy::default();
        let items = vec![Guarded::new(true), Guarded::new(true)];
        let result = strategy
            .execute(items, &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.close_can_occur);
        assert_eq!(result.closable.len(), 2);
    }

    #[tokio::test]
    async fn refusal_discards_closable_list_by_default() {
        let strategy = DefaultCloseStrategy::default();
        let items = vec![Guarded::new(true), Guarded::new(false), Guarded::new(true)];
        let result = strategy
            .execute(items, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.close_can_occur);
        assert!(result.closable.is_empty());
    }

    #[tokio::test]
    async fn refusal_keeps_closable_list_when_configured() {
        let strategy = DefaultCloseStrategy::new(true);
        let first = Guarded::new(true);
        let second = Guarded::new(false);
        let third = Guarded::new(true);
        let result = strategy
            .execute(
                vec![first.clone(), second, third.clone()],
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(!result.close_can_occur);
        let ids: Vec<_> = result
            .closable
            .iter()
            .map(|i| i.lifecycle().id())
            .collect();
        assert_eq!(ids, vec![first.lifecycle().id(), third.lifecycle().id()]);
    }
}
